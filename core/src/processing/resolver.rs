use crate::feed::line::decode_latin1;
use crate::math::geo::{haversine_km, GeoPoint, GridLocator};
use crate::prelude::{SpotError, SpotResult};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const UNKNOWN_COUNTRY: &str = "Unknown";

/// Characters that open a zone/override decoration on a prefix.
const DECORATION_OPENERS: &[char] = &['(', '[', '<', '{', '~'];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub country: String,
    pub position: GeoPoint,
}

/// Where a spotted station is, as far as we can tell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub country: String,
    /// Country, with the comment locator appended when one was used.
    pub label: String,
    pub position: Option<GeoPoint>,
    pub locator: Option<GridLocator>,
}

impl Location {
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN_COUNTRY.to_string(),
            label: UNKNOWN_COUNTRY.to_string(),
            position: None,
            locator: None,
        }
    }

    fn from_entity(entity: &Entity) -> Self {
        Self {
            country: entity.country.clone(),
            label: entity.country.clone(),
            position: Some(entity.position),
            locator: None,
        }
    }
}

/// Immutable callsign-prefix table built from the entity database.
#[derive(Debug, Default, Clone)]
pub struct PrefixTable {
    entries: HashMap<String, Entity>,
    /// `=CALL` records; these match the whole call only.
    exact: HashMap<String, Entity>,
}

impl PrefixTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads a cached database file. Bytes are Latin-1.
    pub fn load<P: AsRef<Path>>(path: P) -> SpotResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|err| SpotError::Database(format!("reading {}: {err}", path.display())))?;
        let table = Self::parse(&decode_latin1(&bytes));
        if table.is_empty() {
            return Err(SpotError::Database(format!(
                "{} holds no usable records",
                path.display()
            )));
        }
        Ok(table)
    }

    /// Header lines (`name:cq:itu:cont:lat:lon:utc:prefix:`) are followed
    /// by one or more comma-separated prefix lines. Longitudes in the file
    /// are positive west.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        let mut exact = HashMap::new();
        let mut current: Option<Entity> = None;
        let mut entity_count = 0usize;
        let mut skipped = 0usize;

        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if line.contains(':') {
                current = parse_header(line);
                match &current {
                    Some(entity) => {
                        entity_count += 1;
                        if let Some((primary, _)) = line.split(':').nth(7).and_then(clean_prefix) {
                            entries.insert(primary, entity.clone());
                        }
                    }
                    None => skipped += 1,
                }
                continue;
            }

            let Some(entity) = &current else { continue };
            for (prefix, whole_call) in line.split(',').filter_map(clean_prefix) {
                let target = if whole_call { &mut exact } else { &mut entries };
                target.insert(prefix, entity.clone());
            }
        }

        if skipped > 0 {
            warn!("entity database: skipped {} malformed records", skipped);
        }
        info!(
            "entity database: {} prefixes and {} exact calls for {} entities",
            entries.len(),
            exact.len(),
            entity_count
        );
        Self { entries, exact }
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.exact.is_empty()
    }

    /// Exact call, then longest prefix, on the whole call and then on the
    /// part after the last `/`.
    pub fn lookup(&self, callsign: &str) -> Option<&Entity> {
        let call = callsign.trim().to_ascii_uppercase();
        let suffix = call
            .rsplit_once('/')
            .map(|(_, after)| after)
            .filter(|after| !after.is_empty());

        std::iter::once(call.as_str())
            .chain(suffix)
            .find_map(|candidate| {
                self.exact
                    .get(candidate)
                    .or_else(|| self.longest_prefix(candidate))
            })
    }

    fn longest_prefix(&self, candidate: &str) -> Option<&Entity> {
        (1..=candidate.len())
            .rev()
            .filter_map(|len| candidate.get(..len))
            .find_map(|prefix| self.entries.get(prefix))
    }

    /// Database position, refined by a grid locator found in the comment.
    pub fn resolve(&self, callsign: &str, comment: &str) -> Location {
        let mut location = self
            .lookup(callsign)
            .map(Location::from_entity)
            .unwrap_or_else(Location::unknown);

        if let Some(locator) = GridLocator::find_in(comment) {
            let point = locator.center();
            if point.lat != 0.0 && point.lon != 0.0 {
                location.position = Some(point);
                location.label = format!("{} ({})", location.country, locator);
                location.locator = Some(locator);
            }
        }
        location
    }
}

/// Zero until both ends are known.
pub fn distance_km(observer: Option<GeoPoint>, spot: Option<GeoPoint>) -> f64 {
    match (observer, spot) {
        (Some(from), Some(to)) => haversine_km(from, to),
        _ => 0.0,
    }
}

fn parse_header(line: &str) -> Option<Entity> {
    let fields: Vec<&str> = line.split(':').map(str::trim).collect();
    if fields.len() < 6 || fields[0].is_empty() {
        return None;
    }
    let lat: f64 = fields[4].parse().ok()?;
    let lon_west: f64 = fields[5].parse().ok()?;
    Some(Entity {
        country: fields[0].to_string(),
        position: GeoPoint::new(lat, -lon_west),
    })
}

/// Bare prefix, and whether the record names one exact call.
fn clean_prefix(raw: &str) -> Option<(String, bool)> {
    let raw = raw.trim().trim_end_matches(';').trim_start_matches('*');
    let whole_call = raw.starts_with('=');
    let raw = raw.trim_start_matches('=');
    let cut = raw.find(DECORATION_OPENERS).unwrap_or(raw.len());
    let prefix: String = raw[..cut]
        .chars()
        .filter(|c| *c != '&')
        .collect::<String>()
        .trim()
        .to_ascii_uppercase();

    let valid = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/');
    valid.then_some((prefix, whole_call))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Germany:                  14:  28:  EU:   51.00:   -10.00:    -1.0:  DL:
    DA,DB,DC,DD,DE,DF,DG,DH,DI,DJ,DK,DL,DM,DN,DO,DP,DQ,DR,=DL0ABC(14)[28];
Falkland Islands:         13:  16:  SA:  -51.63:    58.72:     4.0:  VP8:
    VP8,VP8PJ<-60.7/45.6>,=VP8STI[73];
broken header: 1: 2
    ZZ,ZY;
United States:             5:   8:  NA:   37.53:    91.67:     5.0:  K:
    AA,AB,K,N,W,
    KH6[61]{31},
    =W1AW;
";

    #[test]
    fn parses_two_line_and_continuation_records() {
        let table = PrefixTable::parse(SAMPLE);
        let germany = table.lookup("DL1ABC").unwrap();
        assert_eq!(germany.country, "Germany");
        assert_eq!(germany.position, GeoPoint::new(51.0, 10.0));
        assert_eq!(table.lookup("KH6XX").unwrap().country, "United States");
        assert_eq!(table.lookup("DL0ABC").unwrap().country, "Germany");
        assert!(table.lookup("ZZ1AA").is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let table = PrefixTable::parse(SAMPLE);
        assert_eq!(table.lookup("vp8pj").unwrap().country, "Falkland Islands");
        assert_eq!(table.lookup("W1AW").unwrap().country, "United States");
    }

    #[test]
    fn exact_call_records_do_not_act_as_prefixes() {
        let table = PrefixTable::parse(
            "\
Alaska:                    1:   1:  NA:   61.40:   148.87:     9.0:  KL:
    AL,KL,NL,WL,=KE7A;
United States:             5:   8:  NA:   37.53:    91.67:     5.0:  K:
    AA,K,N,W;
",
        );
        assert_eq!(table.lookup("KE7A").unwrap().country, "Alaska");
        assert_eq!(table.lookup("ke7ab").unwrap().country, "United States");
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn portable_call_falls_back_to_part_after_separator() {
        let table = PrefixTable::parse(SAMPLE);
        assert_eq!(table.lookup("3Y0J/VP8").unwrap().country, "Falkland Islands");
        assert_eq!(table.lookup("DL1ABC/P").unwrap().country, "Germany");
        assert!(table.lookup("3Y0J/").is_none());
    }

    #[test]
    fn comment_locator_refines_position() {
        let table = PrefixTable::parse(SAMPLE);
        let location = table.resolve("DL1ABC", "FT8 jo62 -12dB");
        assert_eq!(location.label, "Germany (JO62)");
        assert_eq!(
            location.position,
            Some(GridLocator::parse("JO62").unwrap().center())
        );

        let plain = table.resolve("DL1ABC", "tnx");
        assert_eq!(plain.label, "Germany");
        assert_eq!(plain.position, Some(GeoPoint::new(51.0, 10.0)));
    }

    #[test]
    fn unknown_call_has_no_position_and_no_distance() {
        let table = PrefixTable::empty();
        let location = table.resolve("XX9XX", "");
        assert_eq!(location, Location::unknown());
        assert_eq!(
            distance_km(Some(GeoPoint::new(48.0, 2.0)), location.position),
            0.0
        );
        assert_eq!(distance_km(None, Some(GeoPoint::new(48.0, 2.0))), 0.0);
    }

    #[test]
    fn load_reads_latin1_file_and_rejects_empty() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"R\xe9union:  39:  53:  AF:  -21.12:  -55.60:  -4.0:  FR:\n  FR;\n")
            .unwrap();
        let table = PrefixTable::load(temp.path()).unwrap();
        assert_eq!(table.lookup("FR5AB").unwrap().country, "Réunion");

        let empty = NamedTempFile::new().unwrap();
        assert!(matches!(
            PrefixTable::load(empty.path()),
            Err(SpotError::Database(_))
        ));
    }
}

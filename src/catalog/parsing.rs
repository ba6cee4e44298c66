use super::types::{ObjectType, OrbitalElement};

/// NORAD catalog number from columns 3-7 of line 1.
pub fn extract_norad_id(line1: &str) -> Option<u32> {
    line1.get(2..7)?.trim().parse().ok()
}

/// Guess the object type from its published name.
pub fn classify_object(name: &str) -> ObjectType {
    let upper = name.to_uppercase();
    if upper.contains("DEB") {
        ObjectType::Debris
    } else if upper.contains("R/B") || upper.contains("ROCKET BODY") {
        ObjectType::RocketBody
    } else {
        ObjectType::Payload
    }
}

/// Parse multi-object TLE content.
///
/// Accepts both the 3-line (name + elements) and bare 2-line layouts. Unnamed
/// records are labelled with their NORAD id.
pub fn parse_multi_tle(content: &str) -> Vec<OrbitalElement> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            let line1 = lines[i];
            let name = match extract_norad_id(line1) {
                Some(id) => format!("NORAD {}", id),
                None => "UNKNOWN".to_string(),
            };
            result.push(OrbitalElement::new(name, line1, lines[i + 1]));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            let name = lines[i].strip_prefix("0 ").unwrap_or(lines[i]);
            result.push(OrbitalElement::new(name, lines[i + 1], lines[i + 2]));
            i += 3;
        } else {
            log::debug!("Skipping unrecognised TLE line: {}", lines[i]);
            i += 1;
        }
    }

    result
}

//! Formatting utilities for results display.

/// Shorten doubles crews to family names: `"SMITH John/JONES Mike"` → `"SMITH/JONES"`
pub fn format_name(name: &str) -> String {
    let mut crew = name.split('/');
    let (Some(first), Some(second)) = (crew.next(), crew.next()) else {
        return name.to_string();
    };
    let family = |member: &str| member.split(' ').next().unwrap_or_default().to_string();
    format!("{}/{}", family(first), family(second))
}

/// Rank label: `"3."`, or empty when the rank is unknown
pub fn format_rank(rank: Option<u32>) -> String {
    rank.map(|r| format!("{}.", r)).unwrap_or_default()
}

/// Penalty seconds; absent penalties show as `"0"`
pub fn format_penalty(penalty: &str) -> String {
    let penalty = penalty.trim();
    if penalty.is_empty() {
        "0".to_string()
    } else {
        penalty.to_string()
    }
}

/// Boat category from a race name: `"K1m - Final"` → `Some("K1M")`
///
/// The category is the leading class code (K or C, crew size 1 or 2, one
/// optional suffix letter) followed by whitespace. Case-insensitive.
pub fn category_from_race_name(race_name: &str) -> Option<String> {
    let mut chars = race_name.chars();
    let boat = chars
        .next()
        .filter(|c| matches!(c.to_ascii_uppercase(), 'K' | 'C'))?;
    let crew = chars.next().filter(|c| matches!(c, '1' | '2'))?;

    let mut category = String::from(boat);
    category.push(crew);

    match chars.next()? {
        c if c.is_whitespace() => {}
        suffix => {
            if !chars.next()?.is_whitespace() {
                return None;
            }
            category.push(suffix);
        }
    }

    Some(category.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name_single() {
        assert_eq!(format_name("NOVAK Jan"), "NOVAK Jan");
        assert_eq!(format_name(""), "");
    }

    #[test]
    fn test_format_name_doubles() {
        assert_eq!(format_name("SMITH John/JONES Mike"), "SMITH/JONES");
        assert_eq!(format_name("SMITH/JONES"), "SMITH/JONES");
    }

    #[test]
    fn test_format_rank() {
        assert_eq!(format_rank(Some(1)), "1.");
        assert_eq!(format_rank(None), "");
    }

    #[test]
    fn test_format_penalty_default() {
        assert_eq!(format_penalty(""), "0");
        assert_eq!(format_penalty(" 52 "), "52");
    }

    #[test]
    fn test_category_from_race_name() {
        assert_eq!(category_from_race_name("K1m - Final"), Some("K1M".to_string()));
        assert_eq!(category_from_race_name("C2x Semi"), Some("C2X".to_string()));
        assert_eq!(category_from_race_name("C1 Heats"), Some("C1".to_string()));
        assert_eq!(category_from_race_name("k1w run 2"), Some("K1W".to_string()));
    }

    #[test]
    fn test_category_rejects_other_names() {
        assert_eq!(category_from_race_name("Kayak Cross"), None);
        assert_eq!(category_from_race_name("K3m Final"), None);
        assert_eq!(category_from_race_name("K1men Final"), None);
        assert_eq!(category_from_race_name("K1"), None);
        assert_eq!(category_from_race_name(""), None);
    }
}

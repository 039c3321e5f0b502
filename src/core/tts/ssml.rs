//! SSML helpers shared by the markup-based providers.

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Speaking rate as a prosody percentage, truncated toward zero (1.255 -> 125).
pub fn rate_percent(rate: f64) -> i32 {
    (rate * 100.0) as i32
}

/// Whether a rate needs prosody markup at all.
pub fn needs_rate_markup(rate: f64) -> bool {
    rate != 1.0
}

/// `<prosody rate="N%">escaped text</prosody>`.
pub fn prosody_rate(text: &str, rate: f64) -> String {
    format!(
        r#"<prosody rate="{}%">{}</prosody>"#,
        rate_percent(rate),
        escape_xml(text)
    )
}

/// Wrap text for a backend that only takes rate through SSML.
///
/// Returns `None` at rate 1.0, where the plain text is sent unchanged.
pub fn wrap_rate(text: &str, rate: f64) -> Option<String> {
    needs_rate_markup(rate).then(|| format!("<speak>{}</speak>", prosody_rate(text, rate)))
}

/// Shallow SSML check: an opening `<speak` and a closing `</speak>` are present.
pub fn validate(ssml: &str) -> bool {
    ssml.contains("<speak") && ssml.contains("</speak>")
}

/// Gain in decibels for a volume multiplier, clamped to `[-96, 16]`.
///
/// Zero and negative multipliers map to the -96 dB floor.
pub fn volume_gain_db(volume: f64) -> f64 {
    if volume <= 0.0 {
        -96.0
    } else {
        (20.0 * volume.log10()).clamp(-96.0, 16.0)
    }
}

/// Relative volume attribute value for prosody markup, e.g. `+6.02dB`.
pub fn volume_db(volume: f64) -> String {
    format!("{:+.2}dB", volume_gain_db(volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(
            escape_xml(r#"<tag attr="x">'y'</tag>"#),
            "&lt;tag attr=&quot;x&quot;&gt;&apos;y&apos;&lt;/tag&gt;"
        );
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_rate_percent_truncates() {
        assert_eq!(rate_percent(1.5), 150);
        assert_eq!(rate_percent(1.0), 100);
        assert_eq!(rate_percent(0.75), 75);
        assert_eq!(rate_percent(1.255), 125);
    }

    #[test]
    fn test_wrap_rate() {
        assert_eq!(wrap_rate("Hello", 1.0), None);
        assert_eq!(
            wrap_rate("Hello", 1.5).as_deref(),
            Some(r#"<speak><prosody rate="150%">Hello</prosody></speak>"#)
        );
        assert_eq!(
            wrap_rate("Tom & Jerry", 0.8).as_deref(),
            Some(r#"<speak><prosody rate="80%">Tom &amp; Jerry</prosody></speak>"#)
        );
    }

    #[test]
    fn test_validate() {
        assert!(validate("<speak>Hello</speak>"));
        assert!(validate(r#"<speak version="1.0">Hi</speak>"#));
        assert!(!validate("<speak>Hello"));
        assert!(!validate("Hello</speak>"));
        assert!(!validate("Hello"));
    }

    #[test]
    fn test_volume_gain_db_clamps() {
        assert_eq!(volume_gain_db(1.0), 0.0);
        assert_eq!(volume_gain_db(-1.0), -96.0);
        assert!((volume_gain_db(2.0) - 6.0206).abs() < 1e-3);
        assert_eq!(volume_gain_db(1000.0), 16.0);
    }

    #[test]
    fn test_volume_db() {
        assert_eq!(volume_db(1.0), "+0.00dB");
        assert_eq!(volume_db(2.0), "+6.02dB");
        assert_eq!(volume_db(0.5), "-6.02dB");
        assert_eq!(volume_db(0.0), "-96.00dB");
    }
}

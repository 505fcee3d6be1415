/// Fill used when a feature has no usable `fillColor`: muted blue at
/// partial opacity so overlapping areas still read.
pub const DEFAULT_FILL: [f32; 4] = [0.25, 0.5, 0.85, 0.45];

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into linear-ish RGBA components.
pub fn parse_fill_color(value: &str) -> Option<[f32; 4]> {
    let hex = value.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);

    match hex.len() {
        3 => {
            let mut out = [0.0f32; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = u8::from_str_radix(&c.to_string(), 16).ok()? as f32;
                out[i] = v * 17.0 / 255.0; // 0xf -> 0xff
            }
            out[3] = 1.0;
            Some(out)
        }
        6 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            1.0,
        ]),
        8 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ]),
        _ => None,
    }
}

/// Resolve a feature's fill: parse when present, otherwise the default.
pub fn fill_color_or_default(value: Option<&str>) -> [f32; 4] {
    value.and_then(parse_fill_color).unwrap_or(DEFAULT_FILL)
}

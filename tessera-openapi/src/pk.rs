/// Strict canonical UUID test: 8-4-4-4-12 lowercase-or-uppercase hex with
/// hyphens at fixed offsets.
///
/// The strictness matters for routing: a numeric identifier that happens to
/// be all hex digits must still resolve through `/{model}/{id}/`, and the
/// 32-hex no-hyphen form is not accepted either.
pub fn is_canonical_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if *b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

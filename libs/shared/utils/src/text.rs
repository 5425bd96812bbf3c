// libs/shared/utils/src/text.rs

/// Strip formatting masks from phone numbers and CPF documents so only the
/// digits are stored.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Deterministic placeholder avatar for records created without a photo.
pub fn generated_avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        urlencoding::encode(name)
    )
}

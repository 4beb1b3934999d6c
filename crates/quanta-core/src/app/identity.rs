//! User identity and host profile.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::UserData;
use crate::error::Result;
use crate::ports::KeyValueStore;

pub const USER_ID_KEY: &str = "tools.quanta.id";

/// Length of a shortened id: 16 bytes in unpadded base64.
pub const SHORT_ID_LEN: usize = 22;

/// URL-safe, unpadded base64 of the UUID's 16 bytes.
pub fn shorten(uuid: &Uuid) -> String {
    URL_SAFE_NO_PAD.encode(uuid.as_bytes())
}

/// Only the hyphenated `8-4-4-4-12` form counts as a UUID here.
fn parse_uuid(value: &str) -> Option<Uuid> {
    if value.len() != 36 {
        return None;
    }
    Uuid::try_parse(value).ok()
}

/// UUIDs are shortened; anything else is kept, with a warning unless it
/// already looks like a shortened id.
pub fn normalize_user_id(id: &str) -> String {
    if let Some(uuid) = parse_uuid(id) {
        return shorten(&uuid);
    }
    if id.chars().count() != SHORT_ID_LEN {
        warn!(
            user_id = id,
            "id does not look like a UUID or a shortened id; prefer one of those as user id"
        );
    }
    id.to_string()
}

/// UUID app ids are shortened; anything else is used as is.
pub fn normalize_app_id(app_id: &str) -> String {
    match parse_uuid(app_id) {
        Some(uuid) => shorten(&uuid),
        None => app_id.to_string(),
    }
}

/// Configured id wins; otherwise reuse the persisted one, or generate and
/// persist a fresh shortened UUID.
pub async fn resolve_user_id(store: &dyn KeyValueStore, configured: Option<&str>) -> Result<String> {
    if let Some(id) = configured.filter(|id| !id.is_empty()) {
        return Ok(normalize_user_id(id));
    }

    if let Some(bytes) = store.read(USER_ID_KEY).await? {
        match String::from_utf8(bytes) {
            Ok(id) if !id.is_empty() => return Ok(id),
            _ => warn!(key = USER_ID_KEY, "stored user id is unreadable; generating a new one"),
        }
    }

    let id = shorten(&Uuid::new_v4());
    store.write(USER_ID_KEY, id.as_bytes()).await?;
    info!(user_id = %id, "generated new user id");
    Ok(id)
}

/// Profile of the running host. Fields the builder does not override are
/// filled from the build target and the environment.
pub fn host_profile(id: String, app_id: String) -> UserData {
    UserData {
        id,
        app_id,
        device: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        bundle_id: env!("CARGO_PKG_NAME").to_string(),
        debug_flags: if cfg!(debug_assertions) { 1 } else { 0 },
        version: env!("CARGO_PKG_VERSION").to_string(),
        language: language_from_env(),
    }
}

/// `LANG=de_DE.UTF-8` -> `de_DE`.
fn language_from_env() -> String {
    std::env::var("LANG")
        .ok()
        .and_then(|lang| parse_language(&lang))
        .unwrap_or_else(|| "en_US".to_string())
}

fn parse_language(lang: &str) -> Option<String> {
    let lang = lang.split(['.', '@']).next()?.replace('-', "_");
    match lang.as_str() {
        "" | "C" | "POSIX" => None,
        _ => Some(lang),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::impls::MemoryStore;

    #[tokio::test]
    async fn configured_id_is_used_and_not_persisted() {
        let store = MemoryStore::new();
        let id = resolve_user_id(&store, Some("fixed")).await.unwrap();
        assert_eq!(id, "fixed");
        assert!(!store.contains(USER_ID_KEY).await);
    }

    #[tokio::test]
    async fn generated_id_is_persisted_and_reused() {
        let store = MemoryStore::new();
        let first = resolve_user_id(&store, None).await.unwrap();
        assert_eq!(first.len(), SHORT_ID_LEN);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );

        let second = resolve_user_id(&store, None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_configured_id_falls_back_to_store() {
        let store = MemoryStore::new();
        store.write(USER_ID_KEY, b"persisted").await.unwrap();
        let id = resolve_user_id(&store, Some("")).await.unwrap();
        assert_eq!(id, "persisted");
    }

    #[tokio::test]
    async fn configured_uuid_is_shortened() {
        let store = MemoryStore::new();
        let id = resolve_user_id(&store, Some("123e4567-e89b-12d3-a456-426614174000"))
            .await
            .unwrap();
        assert_eq!(id, "Ej5FZ-ibEtOkVkJmFBdAAA");
    }

    #[rstest]
    #[case("00000000-0000-0000-0000-000000000000", "AAAAAAAAAAAAAAAAAAAAAA")]
    #[case("ffffffff-ffff-ffff-ffff-ffffffffffff", "_____________________w")]
    #[case("FBEFFBEF-FBEF-FBEF-FBEF-FBEFFBEFFBEF", "--_77_vv--_77_vv--_77w")]
    #[case("Ej5FZ-ibEtOkVkJmFBdAAA", "Ej5FZ-ibEtOkVkJmFBdAAA")]
    #[case("customer-42", "customer-42")]
    #[case("123e4567e89b12d3a456426614174000", "123e4567e89b12d3a456426614174000")]
    fn user_id_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_user_id(input), expected);
    }

    #[rstest]
    #[case("123e4567-e89b-12d3-a456-426614174000", "Ej5FZ-ibEtOkVkJmFBdAAA")]
    #[case("my-app", "my-app")]
    fn app_id_normalization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_app_id(input), expected);
    }

    #[rstest]
    #[case("de_DE.UTF-8", Some("de_DE"))]
    #[case("en-GB", Some("en_GB"))]
    #[case("sr_RS@latin", Some("sr_RS"))]
    #[case("C", None)]
    #[case("", None)]
    fn language_parsing(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_language(input).as_deref(), expected);
    }
}

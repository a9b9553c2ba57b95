//! Launch arguments and automation-signal evasions for the headed session.

use rand::prelude::SliceRandom;
use std::path::Path;

/// Fixed viewport for every session; the agent's observations assume it.
pub const VIEWPORT: (u32, u32) = (1280, 900);

/// Snapshot of user agent and locale characteristics for one session.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    pub user_agent: String,
    pub platform: String,
    pub languages: Vec<String>,
}

/// Pick a plausible desktop profile for this session.
pub fn session_profile() -> SessionProfile {
    let profiles = [
        SessionProfile {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            platform: "Win32".to_string(),
            languages: vec!["en-US".to_string(), "en".to_string()],
        },
        SessionProfile {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            platform: "MacIntel".to_string(),
            languages: vec!["en-US".to_string(), "en".to_string()],
        },
    ];
    let mut rng = rand::thread_rng();
    profiles.choose(&mut rng).unwrap().clone()
}

/// Chrome command-line arguments for a headed, persistent-profile session.
pub fn build_launch_arguments(profile: &SessionProfile, user_data_dir: &Path) -> Vec<String> {
    vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
        format!("--user-agent={}", profile.user_agent),
        format!("--window-size={},{}", VIEWPORT.0, VIEWPORT.1),
        format!("--lang={}", profile.languages.join(",")),
    ]
}

/// JavaScript evasions applied after navigation to reduce automation
/// signals (`navigator.webdriver` and friends).
pub const WEBDRIVER_EVASIONS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en']
    });
    if (!window.chrome) window.chrome = { runtime: {} };
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn launch_arguments_pin_profile_and_viewport() {
        let profile = session_profile();
        let dir = PathBuf::from("/tmp/webpilot-profile");
        let args = build_launch_arguments(&profile, &dir);

        assert!(args.contains(&"--user-data-dir=/tmp/webpilot-profile".to_string()));
        assert!(args.contains(&"--window-size=1280,900".to_string()));
        assert!(args
            .iter()
            .any(|a| a == "--disable-blink-features=AutomationControlled"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla")));
    }
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RulesConfig {
    pub content_patterns: Option<Vec<String>>, // byte regexes run against file contents
    pub cheat_signers: Option<Vec<String>>,    // case-insensitive substrings of a signer blob
}

const DEFAULT_CONTENT_PATTERNS: &[&str] = &[
    "(?i)aimbot",
    "(?i)triggerbot",
    "(?i)wallhack",
    "(?i)no[ _-]?recoil",
    "(?i)silent[ _-]?aim",
    "(?i)esp[ _-](box|enabled|color)",
    "(?i)bunny[ _-]?hop",
    "(?i)skin[ _-]?changer",
    "(?i)manual[ _-]?map",
    "(?i)autoclicker",
    "(?i)self[ _-]?destruct",
];

const DEFAULT_CHEAT_SIGNERS: &[&str] = &[
    "Manthe Industries",
    "Mynt SASU",
    "Cheat Engine",
    "Dark Byte",
    "Interium",
];

impl RulesConfig {
    pub fn content_patterns(&self) -> Vec<String> {
        match &self.content_patterns {
            Some(v) if !v.is_empty() => v.clone(),
            _ => DEFAULT_CONTENT_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn cheat_signers(&self) -> Vec<String> {
        match &self.cheat_signers {
            Some(v) if !v.is_empty() => v.clone(),
            _ => DEFAULT_CHEAT_SIGNERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn load_rules(path_opt: Option<&str>) -> Option<RulesConfig> {
    let path = path_opt
        .map(|s| s.to_string())
        .or_else(|| std::env::var("AMSCAN_RULES_PATH").ok())
        .unwrap_or_else(|| "rules.json".to_string());
    let p = std::path::PathBuf::from(&path);
    let data = match std::fs::read(&p) {
        Ok(d) => d,
        Err(e) => {
            if path_opt.is_some() { log::warn!("Failed to read rules file {}: {}", p.to_string_lossy(), e); }
            else { log::debug!("No rules file at {}: {}", p.to_string_lossy(), e); }
            return None;
        }
    };
    let cfg: RulesConfig = match serde_json::from_slice(&data) { Ok(c) => c, Err(e) => { log::warn!("Failed to parse rules file {}: {}", p.to_string_lossy(), e); return None } };
    Some(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_lists_absent_or_empty() {
        let cfg = RulesConfig { content_patterns: Some(vec![]), cheat_signers: None };
        assert!(cfg.content_patterns().iter().any(|p| p.contains("aimbot")));
        assert!(cfg.cheat_signers().iter().any(|s| s == "Manthe Industries"));
    }

    #[test]
    fn loads_rules_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("rules.json");
        std::fs::write(&p, r#"{"content_patterns":["evil"],"cheat_signers":["Bad Corp"]}"#).unwrap();
        let cfg = load_rules(Some(&p.to_string_lossy())).unwrap();
        assert_eq!(cfg.content_patterns(), vec!["evil".to_string()]);
        assert_eq!(cfg.cheat_signers(), vec!["Bad Corp".to_string()]);
    }

    #[test]
    fn invalid_rules_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("rules.json");
        std::fs::write(&p, "not json").unwrap();
        assert!(load_rules(Some(&p.to_string_lossy())).is_none());
    }
}

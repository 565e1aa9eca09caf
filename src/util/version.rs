pub const APP_NAME: &str = "Craft Value Scanner";
pub const APP_REPO_URL: &str = "https://github.com/skynatbs/craft_value_scanner";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// User agent sent to the market data service.
pub fn user_agent() -> String {
    format!("{}/{} (+{})", APP_NAME, version_label(), APP_REPO_URL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_app_and_version() {
        let agent = user_agent();
        assert!(agent.starts_with("Craft Value Scanner/"));
        assert!(agent.contains(&version_label()));
    }
}

use rand::seq::SliceRandom;

const DESKTOP_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

const DESKTOP_VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

const BRAZIL_ACCEPT_LANGUAGE: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";

/// Browser identity presented to the airline site.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// A desktop Chrome visitor from Brazil with a random agent and screen.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        let user_agent = DESKTOP_AGENTS.choose(&mut rng).unwrap_or(&DESKTOP_AGENTS[0]);
        let (width, height) = *DESKTOP_VIEWPORTS
            .choose(&mut rng)
            .unwrap_or(&DESKTOP_VIEWPORTS[0]);

        Self {
            user_agent: (*user_agent).to_string(),
            accept_language: BRAZIL_ACCEPT_LANGUAGE.to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Pin the window size, keeping the randomized user agent.
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_randomized_fingerprint() {
        let config = FingerprintConfig::randomized();
        assert!(DESKTOP_AGENTS.contains(&config.user_agent.as_str()));
        assert!(config.accept_language.starts_with("pt-BR"));
        assert!(DESKTOP_VIEWPORTS.contains(&(config.viewport_width, config.viewport_height)));
    }

    #[test]
    fn test_with_viewport() {
        let config = FingerprintConfig::randomized().with_viewport(1280, 720);
        assert_eq!((config.viewport_width, config.viewport_height), (1280, 720));
    }

    #[test]
    fn test_agents_vary_between_sessions() {
        // Twenty identical draws from three agents is vanishingly unlikely
        let agents: std::collections::HashSet<_> = (0..20)
            .map(|_| FingerprintConfig::randomized().user_agent)
            .collect();
        assert!(agents.len() > 1);
    }
}

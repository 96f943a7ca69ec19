//! Terminal capability detection
//!
//! Decides whether progress bars and colors are used. Progress goes to
//! stderr, results to stdout; both must be terminals for bars to render.

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdout};

/// Variables set by common CI runners, which often allocate a TTY
const CI_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "JENKINS_URL",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "TRAVIS",
    "CIRCLECI",
    "BUILDKITE",
    "DRONE",
    "TEAMCITY_VERSION",
    "TF_BUILD", // Azure DevOps
];

/// What the attached terminal can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCaps {
    /// stdout is an interactive terminal outside CI
    pub interactive: bool,
    pub stderr_tty: bool,
    /// ANSI escapes render (interactive and a capable `TERM`)
    pub ansi: bool,
    /// `NO_COLOR` is set
    pub no_color: bool,
}

impl TerminalCaps {
    /// Inspect the real process streams and environment
    pub fn detect() -> Self {
        Self::from_parts(
            stdout().is_terminal(),
            stderr().is_terminal(),
            |name| env::var(name).ok(),
        )
    }

    /// Build from stream state and an environment lookup
    pub fn from_parts(
        stdout_tty: bool,
        stderr_tty: bool,
        var: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let ci = CI_VARS.iter().any(|name| var(name).is_some());
        let noninteractive = var("DEBIAN_FRONTEND").as_deref() == Some("noninteractive");
        let interactive = stdout_tty && !ci && !noninteractive;

        let term = var("TERM").unwrap_or_default();
        let capable_term = if cfg!(windows) {
            term != "dumb"
        } else {
            !(term.is_empty() || term == "dumb")
        };

        Self {
            interactive,
            stderr_tty,
            ansi: interactive && capable_term,
            no_color: var("NO_COLOR").is_some(),
        }
    }

    /// Render progress bars if the configuration allows them
    pub fn show_progress(&self, enabled: bool) -> bool {
        enabled && self.interactive && self.stderr_tty && self.ansi
    }

    /// Emit colors if the configuration allows them
    pub fn use_color(&self, enabled: bool) -> bool {
        enabled && self.ansi && !self.no_color
    }
}

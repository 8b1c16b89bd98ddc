//! Library routing rules and notification path rewriting
//!
//! Routing picks the (source-root, target-root) pair the engine syncs
//! between; rewriting translates a synced path into the view the media
//! server has of the same file. Both walk the same ordered rule list, first
//! match wins, the default pair last.

use std::path::{Path, PathBuf};

use mirrorq_domain::{LibraryConfig, LibraryRule};
use tracing::debug;

/// Ordered, first-match-wins library router.
#[derive(Debug, Clone)]
pub struct LibraryRouter {
    /// Configured rules followed by the default pair as a match-all rule.
    rules: Vec<LibraryRule>,
    /// Filesystem root the engine mounts; last-resort rewrite prefix.
    root: PathBuf,
}

impl LibraryRouter {
    pub fn new(config: &LibraryConfig) -> Self {
        let mut rules = config.rules.clone();
        rules.push(LibraryRule {
            pattern: String::new(),
            source: config.default.source.clone(),
            target: config.default.target.clone(),
        });
        Self { rules, root: config.root.clone() }
    }

    /// Resolve the root pair for a queue entry.
    ///
    /// Substring match against the raw path; an empty pattern (the default
    /// pair) matches everything. Precedence is strictly rule order.
    pub fn route(&self, path: &str) -> &LibraryRule {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.pattern.is_empty() || path.contains(&rule.pattern))
            .expect("router always ends with a match-all default rule");
        debug!(path, pattern = %rule.pattern, source = %rule.source.display(), "routed entry");
        rule
    }

    /// Rewrite a synced path into the media server's view for notification.
    ///
    /// First rule whose source root is a path prefix wins; when none
    /// matches, the mount root is swapped for the default target as a bare
    /// fallback. A path outside every known root is reported unchanged.
    pub fn rewrite(&self, path: &str) -> String {
        let candidate = Path::new(path);
        for rule in &self.rules {
            if let Ok(rest) = candidate.strip_prefix(&rule.source) {
                return rule.target.join(rest).display().to_string();
            }
        }
        if let Ok(rest) = candidate.strip_prefix(&self.root) {
            let default = &self.rules[self.rules.len() - 1];
            return default.target.join(rest).display().to_string();
        }
        path.to_string()
    }

    /// Unique target roots of all configured pairs, for post-run fixups.
    pub fn target_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !roots.contains(&rule.target) {
                roots.push(rule.target.clone());
            }
        }
        roots
    }
}

#[cfg(test)]
mod tests {
    use mirrorq_domain::LibraryPair;

    use super::*;

    fn config() -> LibraryConfig {
        LibraryConfig {
            root: PathBuf::from("/data"),
            rules: vec![LibraryRule {
                pattern: "movies-4k".into(),
                source: PathBuf::from("/data/movies-4k"),
                target: PathBuf::from("/data/jellyfin/movies-4k"),
            }],
            default: LibraryPair {
                source: PathBuf::from("/data/movies"),
                target: PathBuf::from("/data/jellyfin/movies"),
            },
        }
    }

    #[test]
    fn alternate_pattern_takes_precedence_over_default() {
        let router = LibraryRouter::new(&config());

        let rule = router.route("/data/movies-4k/Dune (2021)/Dune (2021).mkv");
        assert_eq!(rule.source, PathBuf::from("/data/movies-4k"));

        let rule = router.route("/data/movies/Avatar (2009)/Avatar (2009).mkv");
        assert_eq!(rule.source, PathBuf::from("/data/movies"));
    }

    #[test]
    fn first_matching_rule_wins_when_patterns_overlap() {
        let mut cfg = config();
        cfg.rules.push(LibraryRule {
            pattern: "movies".into(),
            source: PathBuf::from("/data/misc"),
            target: PathBuf::from("/data/jellyfin/misc"),
        });
        let router = LibraryRouter::new(&cfg);

        // Matches both "movies-4k" and "movies"; the earlier rule decides.
        let rule = router.route("/data/movies-4k/Dune (2021)/Dune (2021).mkv");
        assert_eq!(rule.source, PathBuf::from("/data/movies-4k"));
    }

    #[test]
    fn default_pair_catches_everything_else() {
        let router = LibraryRouter::new(&config());
        let rule = router.route("/somewhere/else/movie.mkv");
        assert_eq!(rule.source, PathBuf::from("/data/movies"));
        assert_eq!(rule.target, PathBuf::from("/data/jellyfin/movies"));
    }

    #[test]
    fn rewrite_swaps_matching_source_prefix() {
        let router = LibraryRouter::new(&config());
        assert_eq!(
            router.rewrite("/data/movies-4k/Dune (2021)/Dune (2021).mkv"),
            "/data/jellyfin/movies-4k/Dune (2021)/Dune (2021).mkv"
        );
        assert_eq!(
            router.rewrite("/data/movies/Avatar (2009)/Avatar (2009).mkv"),
            "/data/jellyfin/movies/Avatar (2009)/Avatar (2009).mkv"
        );
    }

    #[test]
    fn rewrite_falls_back_to_bare_root_swap() {
        let router = LibraryRouter::new(&config());
        assert_eq!(
            router.rewrite("/data/specials/Short.mkv"),
            "/data/jellyfin/movies/specials/Short.mkv"
        );
    }

    #[test]
    fn rewrite_leaves_foreign_paths_untouched() {
        let router = LibraryRouter::new(&config());
        assert_eq!(router.rewrite("/mnt/other/file.mkv"), "/mnt/other/file.mkv");
    }

    #[test]
    fn prefix_swap_is_component_aware() {
        let router = LibraryRouter::new(&config());
        // "/data/movies-4kish" must not be treated as under "/data/movies-4k".
        assert_eq!(
            router.rewrite("/data/movies-4kish/X.mkv"),
            "/data/jellyfin/movies/movies-4kish/X.mkv"
        );
    }

    #[test]
    fn target_roots_are_deduplicated() {
        let mut cfg = config();
        cfg.rules.push(LibraryRule {
            pattern: "remux".into(),
            source: PathBuf::from("/data/remux"),
            target: PathBuf::from("/data/jellyfin/movies-4k"),
        });
        let router = LibraryRouter::new(&cfg);
        let roots = router.target_roots();
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/data/jellyfin/movies-4k"),
                PathBuf::from("/data/jellyfin/movies"),
            ]
        );
    }
}

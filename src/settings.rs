use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::{Arg, ArgMatches};
use thiserror::Error;
use tracing::debug;

use crate::render::{DotRenderer, NoRenderer, Renderer};

/// Errors that can occur while applying [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The global worker pool could not be set up.
    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Which [`Renderer`] to use for diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// PNG images through graphviz, see [`crate::render::GraphvizRenderer`].
    #[cfg(feature = "graphviz")]
    Graphviz,
    /// DOT source files, see [`DotRenderer`].
    Dot,
    /// No diagrams at all.
    None,
}

impl RendererKind {
    #[cfg(feature = "graphviz")]
    const NAMES: [&'static str; 3] = ["graphviz", "dot", "none"];
    #[cfg(not(feature = "graphviz"))]
    const NAMES: [&'static str; 2] = ["dot", "none"];

    fn from_name(name: &str) -> Self {
        match name {
            #[cfg(feature = "graphviz")]
            "graphviz" => RendererKind::Graphviz,
            "none" => RendererKind::None,
            _ => RendererKind::Dot,
        }
    }
}

/// Runtime settings of the binary and the HTTP server. Every setting can be given on the
/// command line or through an environment variable:
///
/// | flag | variable | default |
/// |------|----------|---------|
/// | `--diagram-dir` | `DFA_DIAGRAM_DIR` | `generated_diagrams` |
/// | `--renderer` | `DFA_RENDERER` | `graphviz` |
/// | `--jobs` | `DFA_JOBS` | number of cores |
/// | `--bind` | `DFA_BIND` | `127.0.0.1:5000` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory into which diagrams are written.
    pub diagram_dir: PathBuf,
    /// How diagrams are produced.
    pub renderer: RendererKind,
    /// Size of the worker pool, `None` lets rayon decide.
    pub jobs: Option<usize>,
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            diagram_dir: PathBuf::from("generated_diagrams"),
            #[cfg(feature = "graphviz")]
            renderer: RendererKind::Graphviz,
            #[cfg(not(feature = "graphviz"))]
            renderer: RendererKind::Dot,
            jobs: None,
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}

impl Settings {
    /// The global arguments from which [`Settings::from_matches`] reads.
    pub fn args() -> [Arg; 3] {
        [
            Arg::new("diagram-dir")
                .long("diagram-dir")
                .env("DFA_DIAGRAM_DIR")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("directory into which diagrams are written"),
            Arg::new("renderer")
                .long("renderer")
                .env("DFA_RENDERER")
                .global(true)
                .value_parser(RendererKind::NAMES)
                .help("how diagrams are produced"),
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .env("DFA_JOBS")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .help("number of worker threads"),
        ]
    }

    /// The argument for the listening address of the server.
    pub fn bind_arg() -> Arg {
        Arg::new("bind")
            .long("bind")
            .env("DFA_BIND")
            .value_parser(clap::value_parser!(SocketAddr))
            .help("address the server listens on")
    }

    /// Collects the settings from parsed command line arguments. Arguments that were not
    /// given keep their default value.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut settings = Settings::default();
        if let Some(dir) = matches.try_get_one::<PathBuf>("diagram-dir").ok().flatten() {
            settings.diagram_dir = dir.clone();
        }
        if let Some(name) = matches.try_get_one::<String>("renderer").ok().flatten() {
            settings.renderer = RendererKind::from_name(name);
        }
        settings.jobs = matches
            .try_get_one::<usize>("jobs")
            .ok()
            .flatten()
            .copied()
            .filter(|&n| n > 0);
        if let Some(bind) = matches.try_get_one::<SocketAddr>("bind").ok().flatten() {
            settings.bind = *bind;
        }
        debug!("using {settings:?}");
        settings
    }

    /// Instantiates the configured renderer.
    pub fn renderer(&self) -> Arc<dyn Renderer> {
        match self.renderer {
            #[cfg(feature = "graphviz")]
            RendererKind::Graphviz => {
                Arc::new(crate::render::GraphvizRenderer::new(&self.diagram_dir))
            }
            RendererKind::Dot => Arc::new(DotRenderer::new(&self.diagram_dir)),
            RendererKind::None => Arc::new(NoRenderer),
        }
    }

    /// Sizes the global worker pool that batches are processed on. This can only be done once
    /// per process and has to happen before the first batch is processed.
    pub fn install_thread_pool(&self) -> Result<(), SettingsError> {
        if let Some(jobs) = self.jobs {
            rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()?;
            debug!("using {jobs} worker threads");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Command;

    use super::*;

    fn cmd() -> Command {
        Command::new("test")
            .args(Settings::args())
            .subcommand(Command::new("serve").arg(Settings::bind_arg()))
    }

    #[test]
    fn defaults() {
        let matches = cmd().try_get_matches_from(["test"]).unwrap();
        let settings = Settings::from_matches(&matches);
        assert_eq!(settings.diagram_dir, PathBuf::from("generated_diagrams"));
        assert_eq!(settings.bind.port(), 5000);
    }

    #[test]
    fn flags_override_defaults() {
        let matches = cmd()
            .try_get_matches_from([
                "test",
                "--diagram-dir",
                "/tmp/out",
                "--renderer",
                "none",
                "serve",
                "--bind",
                "0.0.0.0:8080",
                "--jobs",
                "3",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let settings = Settings::from_matches(sub);
        assert_eq!(settings.diagram_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.renderer, RendererKind::None);
        assert_eq!(settings.jobs, Some(3));
        assert_eq!(settings.bind, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn unknown_renderer_is_rejected() {
        assert!(cmd()
            .try_get_matches_from(["test", "--renderer", "svg"])
            .is_err());
    }

    #[cfg(feature = "graphviz")]
    #[test]
    fn graphviz_is_offered_with_the_feature() {
        let matches = cmd()
            .try_get_matches_from(["test", "--renderer", "graphviz"])
            .unwrap();
        assert_eq!(
            Settings::from_matches(&matches).renderer,
            RendererKind::Graphviz
        );
    }

    #[cfg(not(feature = "graphviz"))]
    #[test]
    fn graphviz_is_rejected_without_the_feature() {
        assert!(cmd()
            .try_get_matches_from(["test", "--renderer", "graphviz"])
            .is_err());
    }

    #[test]
    fn zero_jobs_means_default() {
        let matches = cmd().try_get_matches_from(["test", "-j", "0"]).unwrap();
        assert_eq!(Settings::from_matches(&matches).jobs, None);
    }

    #[test]
    fn renderer_instances() {
        let settings = Settings {
            renderer: RendererKind::None,
            ..Settings::default()
        };
        let diagram = crate::dot::Diagram {
            id: "x".into(),
            name: String::new(),
            initial: "q".into(),
            nodes: vec![],
            edges: vec![],
        };
        assert_eq!(settings.renderer().render(&diagram).unwrap(), None);

        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            renderer: RendererKind::Dot,
            diagram_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let path = settings.renderer().render(&diagram).unwrap().unwrap();
        assert!(path.starts_with(dir.path()));
    }
}

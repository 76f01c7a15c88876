use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, trace};

use crate::dot::Diagram;

/// Errors that can occur while turning a [`Diagram`] into an artifact.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Creating the output directory or writing a file failed.
    #[error("could not write diagram: {0}")]
    Io(#[from] std::io::Error),
    /// The graphviz executable could not be started.
    #[error("could not start `{program}`: {source}")]
    Spawn {
        /// The program that was attempted.
        program: String,
        /// Why it could not be started.
        source: std::io::Error,
    },
    /// Graphviz ran but reported an error.
    #[error("dot exited with {status}: {stderr}")]
    NonZeroExit {
        /// Exit status of the child process.
        status: std::process::ExitStatus,
        /// Whatever the child process wrote to stderr.
        stderr: String,
    },
}

/// Something that turns a [`Diagram`] into an artifact. Implementations are shared between the
/// worker threads of a batch, one call per automaton.
pub trait Renderer: Send + Sync {
    /// Produces the artifact for `diagram` and returns the path under which it can be found,
    /// or `None` if the renderer does not produce artifacts.
    fn render(&self, diagram: &Diagram) -> Result<Option<PathBuf>, RenderError>;
}

/// Turns an automaton identifier into something that is safe to use as part of a file name.
fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|chr| match chr {
            c if c.is_alphanumeric() => c,
            '-' | '_' => chr,
            _ => '_',
        })
        .collect()
}

/// Computes `<directory>/automata_<id>_<YYYYmmdd_HHMMSS>.<extension>`.
pub fn artifact_path(
    directory: &Path,
    id: &str,
    extension: &str,
    timestamp: DateTime<Local>,
) -> PathBuf {
    directory.join(format!(
        "automata_{}_{}.{extension}",
        sanitize_file_stem(id),
        timestamp.format("%Y%m%d_%H%M%S")
    ))
}

/// Writes the DOT source of a diagram, without invoking graphviz.
#[derive(Debug, Clone)]
pub struct DotRenderer {
    directory: PathBuf,
}

impl DotRenderer {
    /// Creates a renderer that writes into `directory`, which is created on demand.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl Renderer for DotRenderer {
    fn render(&self, diagram: &Diagram) -> Result<Option<PathBuf>, RenderError> {
        std::fs::create_dir_all(&self.directory)?;
        let path = artifact_path(&self.directory, &diagram.id, "dot", Local::now());
        std::fs::write(&path, diagram.to_dot())?;
        debug!("wrote dot source of {} to {}", diagram.id, path.display());
        Ok(Some(path))
    }
}

/// Renderer that produces no artifacts at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

impl Renderer for NoRenderer {
    fn render(&self, diagram: &Diagram) -> Result<Option<PathBuf>, RenderError> {
        trace!("not rendering {}", diagram.id);
        Ok(None)
    }
}

/// Renders diagrams to PNG images by running the `dot` program of graphviz. This is only
/// available on the `graphviz` crate feature and makes use of temporary files.
#[cfg(feature = "graphviz")]
#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    directory: PathBuf,
    program: PathBuf,
}

#[cfg(feature = "graphviz")]
impl GraphvizRenderer {
    /// Creates a renderer that writes into `directory`, which is created on demand, using the
    /// `dot` program found on the `PATH`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            program: PathBuf::from("dot"),
        }
    }

    /// Uses the given graphviz executable instead of `dot`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[cfg(feature = "graphviz")]
impl Renderer for GraphvizRenderer {
    fn render(&self, diagram: &Diagram) -> Result<Option<PathBuf>, RenderError> {
        use std::io::Write;

        let dot = diagram.to_dot();
        trace!("writing dot representation\n{}", dot);

        let mut tempfile = tempfile::NamedTempFile::new()?;
        tempfile.write_all(dot.as_bytes())?;

        std::fs::create_dir_all(&self.directory)?;
        let path = artifact_path(&self.directory, &diagram.id, "png", Local::now());

        let output = std::process::Command::new(&self.program)
            .arg("-Tpng")
            .arg("-o")
            .arg(&path)
            .arg(tempfile.path())
            .output()
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!("could not render {}, dot reported\n{}", diagram.id, stderr);
            return Err(RenderError::NonZeroExit {
                status: output.status,
                stderr,
            });
        }

        debug!("rendered {} to {}", diagram.id, path.display());
        Ok(Some(path))
    }
}

//! Services backed by external programs.
//!
//! Images go to the program's stdin as PNG, text goes as UTF-8, and the
//! answer is read from stdout.

use std::ffi::OsString;
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use image::DynamicImage;

use super::{
    parse_markdown_scaffold, CitationClassifier, EquationTranscriber, PageRasterizer,
    ScaffoldGenerator, ServiceError, TableTranscriber,
};
use crate::model::{CitationFields, ScaffoldElement};

/// A program and its leading arguments.
#[derive(Debug, Clone)]
struct Program {
    program: OsString,
    args: Vec<OsString>,
}

impl Program {
    fn new<S: Into<OsString>>(program: S, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a shell-like command line split on whitespace.
    fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(OsString::from);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Run with extra arguments, optionally feeding stdin, and return stdout.
    fn run(&self, extra: &[OsString], stdin: Option<Vec<u8>>) -> Result<Vec<u8>, ServiceError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(extra)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ServiceError::Unavailable(format!("{} not found", self.name()))
                }
                _ => ServiceError::Failed(format!("failed to execute {}: {}", self.name(), e)),
            })?;

        // Feed stdin from another thread so a chatty child cannot deadlock us
        let writer = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => {
                Some(thread::spawn(move || pipe.write_all(&data)))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|e| ServiceError::Failed(format!("{}: {}", self.name(), e)))?;

        if let Some(writer) = writer {
            if let Ok(Err(e)) = writer.join() {
                log::debug!("{} closed stdin early: {}", self.name(), e);
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::Failed(format!(
                "{} exited with {}: {}",
                self.name(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }

    fn run_text(&self, extra: &[OsString], stdin: Option<Vec<u8>>) -> Result<String, ServiceError> {
        let stdout = self.run(extra, stdin)?;
        String::from_utf8(stdout)
            .map_err(|_| ServiceError::InvalidOutput(format!("{} printed non-UTF-8", self.name())))
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ServiceError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| ServiceError::Failed(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer)
}

fn parse_command(command_line: &str) -> Result<Program, ServiceError> {
    Program::parse(command_line)
        .ok_or_else(|| ServiceError::Unavailable("empty command line".to_string()))
}

/// Runs `<command> <pdf>` and parses its stdout as Markdown.
#[derive(Debug, Clone)]
pub struct CommandScaffold {
    program: Program,
}

impl CommandScaffold {
    /// `command_line` is split on whitespace; the PDF path is appended.
    pub fn new(command_line: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            program: parse_command(command_line)?,
        })
    }
}

impl ScaffoldGenerator for CommandScaffold {
    fn infer_structure(&self, pdf: &Path) -> Result<Vec<ScaffoldElement>, ServiceError> {
        let markdown = self.program.run_text(&[pdf.as_os_str().to_owned()], None)?;
        Ok(parse_markdown_scaffold(&markdown))
    }
}

/// Renders pages with a poppler-compatible rasterizer.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    program: Program,
}

impl Default for CommandRasterizer {
    fn default() -> Self {
        Self::pdftoppm()
    }
}

impl CommandRasterizer {
    /// `pdftoppm` from poppler-utils.
    pub fn pdftoppm() -> Self {
        Self {
            program: Program::new("pdftoppm", Vec::new()),
        }
    }

    /// Another program accepting pdftoppm's arguments.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: Program::new(program, Vec::new()),
        }
    }
}

impl PageRasterizer for CommandRasterizer {
    fn render_page(&self, pdf: &Path, page: u32, dpi: u32) -> Result<DynamicImage, ServiceError> {
        // pdftoppm numbers pages from 1
        let number = (page + 1).to_string();
        let args: Vec<OsString> = vec![
            "-png".into(),
            "-r".into(),
            dpi.to_string().into(),
            "-f".into(),
            number.clone().into(),
            "-l".into(),
            number.into(),
            "-singlefile".into(),
            pdf.as_os_str().to_owned(),
        ];
        let png = self.program.run(&args, None)?;
        image::load_from_memory(&png)
            .map_err(|e| ServiceError::InvalidOutput(format!("not an image: {}", e)))
    }
}

/// Pipes a table crop (or the region text) to a program that prints a
/// Markdown table.
#[derive(Debug, Clone)]
pub struct CommandTableTranscriber {
    program: Program,
}

impl CommandTableTranscriber {
    /// `command_line` is split on whitespace.
    pub fn new(command_line: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            program: parse_command(command_line)?,
        })
    }
}

impl TableTranscriber for CommandTableTranscriber {
    fn transcribe_table(
        &self,
        image: Option<&DynamicImage>,
        context: &str,
    ) -> Result<String, ServiceError> {
        let (mode, input) = match image {
            Some(image) => ("--png", encode_png(image)?),
            None => ("--text", context.as_bytes().to_vec()),
        };
        self.program.run_text(&[mode.into()], Some(input))
    }
}

/// Pipes a formula crop to a program that prints LaTeX.
#[derive(Debug, Clone)]
pub struct CommandEquationTranscriber {
    program: Program,
}

impl CommandEquationTranscriber {
    /// `command_line` is split on whitespace.
    pub fn new(command_line: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            program: parse_command(command_line)?,
        })
    }
}

impl EquationTranscriber for CommandEquationTranscriber {
    fn transcribe_equation(&self, image: &DynamicImage) -> Result<String, ServiceError> {
        self.program.run_text(&[], Some(encode_png(image)?))
    }
}

/// Pipes a citation string to a program that prints [`CitationFields`] JSON.
#[derive(Debug, Clone)]
pub struct CommandCitationClassifier {
    program: Program,
}

impl CommandCitationClassifier {
    /// `command_line` is split on whitespace.
    pub fn new(command_line: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            program: parse_command(command_line)?,
        })
    }
}

impl CitationClassifier for CommandCitationClassifier {
    fn classify(&self, citation: &str) -> Result<CitationFields, ServiceError> {
        let json = self
            .program
            .run_text(&[], Some(citation.as_bytes().to_vec()))?;
        serde_json::from_str(json.trim())
            .map_err(|e| ServiceError::InvalidOutput(format!("citation fields: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_parse() {
        let program = Program::parse("nougat --markdown  --batchsize 1").unwrap();
        assert_eq!(program.name(), "nougat");
        assert_eq!(program.args.len(), 3);
        assert!(Program::parse("   ").is_none());
        assert!(CommandScaffold::new("").is_err());
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let rasterizer = CommandRasterizer::with_program("supergrobid-no-such-rasterizer");
        let err = rasterizer
            .render_page(Path::new("paper.pdf"), 0, 72)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_scaffold_from_command_stdout() {
        let scaffold = CommandScaffold::new("echo # Results").unwrap();
        let elements = scaffold.infer_structure(Path::new("paper.pdf")).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text, "Results paper.pdf");
    }

    #[cfg(unix)]
    #[test]
    fn test_classifier_reads_json() {
        let classifier = CommandCitationClassifier::new("cat").unwrap();
        let fields = classifier
            .classify(r#"{"authors": ["A. Vaswani"], "year": "2017"}"#)
            .unwrap();
        assert_eq!(fields.authors, vec!["A. Vaswani".to_string()]);
        assert_eq!(fields.year.as_deref(), Some("2017"));
        assert!(fields.title.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let transcriber = CommandEquationTranscriber::new("false").unwrap();
        let image = DynamicImage::new_rgb8(4, 4);
        let err = transcriber.transcribe_equation(&image).unwrap_err();
        assert!(matches!(err, ServiceError::Failed(_)));
    }
}

//! OCR: turn one page image into text via the `tesseract` CLI.
//!
//! The engine location and tessdata directory are passed in explicitly at
//! construction; nothing here reads or writes process-wide environment
//! variables. [`Tesseract::new`] checks the executable, the tessdata
//! directory and every requested language up front, so a misconfigured
//! install fails before the first document instead of on every page.

use crate::config::{resolve_program, EngineConfig, LanguageSet};
use crate::error::{ExtractError, RecognitionError};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// A black-box image-to-text engine.
///
/// A failure here is page-level: the page pipeline records it and moves on.
pub trait TextRecognizer: Send + Sync {
    /// Recognise the text in `image` using `languages`.
    fn recognize(&self, image: &Path, languages: &LanguageSet) -> Result<String, RecognitionError>;
}

/// OCR engine wrapping the `tesseract` CLI tool.
#[derive(Debug, Clone)]
pub struct Tesseract {
    program: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl Tesseract {
    /// Locate the engine and verify that `languages` are installed.
    pub fn new(engines: &EngineConfig, languages: &LanguageSet) -> Result<Self, ExtractError> {
        let engine = Self::locate(engines)?;
        engine.verify_languages(languages)?;
        info!("Languages set to: {}", languages);
        Ok(engine)
    }

    /// Locate the engine and tessdata directory without checking languages.
    pub fn locate(engines: &EngineConfig) -> Result<Self, ExtractError> {
        let program =
            resolve_program(&engines.tesseract_cmd).ok_or_else(|| ExtractError::EngineNotFound {
                path: engines.tesseract_cmd.clone(),
            })?;

        if let Some(dir) = &engines.tessdata_dir {
            if !dir.is_dir() {
                return Err(ExtractError::TessdataNotFound { path: dir.clone() });
            }
        }

        let engine = Self {
            program,
            tessdata_dir: engines.tessdata_dir.clone(),
        };
        info!("Tesseract command: {}", engine.program.display());
        if let Some(dir) = &engine.tessdata_dir {
            info!("Path to tessdata: {}", dir.display());
        }
        Ok(engine)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check every language against the installed resources.
    ///
    /// With an explicit tessdata directory each `<code>.traineddata` file must
    /// exist; otherwise the engine is asked via `--list-langs`.
    pub fn verify_languages(&self, languages: &LanguageSet) -> Result<(), ExtractError> {
        if let Some(dir) = &self.tessdata_dir {
            for code in languages.iter() {
                let file = traineddata_path(dir, code);
                if !file.is_file() {
                    return Err(ExtractError::LanguageNotInstalled {
                        language: code.to_string(),
                        location: Some(file),
                    });
                }
            }
            return Ok(());
        }

        let installed = self.available_languages()?;
        for code in languages.iter() {
            if !installed.iter().any(|l| l == code) {
                return Err(ExtractError::LanguageNotInstalled {
                    language: code.to_string(),
                    location: None,
                });
            }
        }
        Ok(())
    }

    /// Languages the engine can use, sorted.
    pub fn available_languages(&self) -> Result<Vec<String>, ExtractError> {
        if let Some(dir) = &self.tessdata_dir {
            return list_traineddata(dir).map_err(|_| ExtractError::TessdataNotFound {
                path: dir.clone(),
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg("--list-langs");
        let output = cmd.output().map_err(|_| ExtractError::EngineNotFound {
            path: self.program.clone(),
        })?;
        if !output.status.success() {
            return Err(ExtractError::EngineNotFound {
                path: self.program.clone(),
            });
        }
        // Older releases print the list on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_list_langs(&text))
    }

    fn command(&self, image: &Path, languages: &LanguageSet) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image).arg("stdout");
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l").arg(languages.to_string());
        cmd
    }
}

impl TextRecognizer for Tesseract {
    fn recognize(&self, image: &Path, languages: &LanguageSet) -> Result<String, RecognitionError> {
        let mut cmd = self.command(image, languages);
        debug!("Running Tesseract command: {:?}", cmd);

        let output = cmd.output().map_err(|source| RecognitionError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(RecognitionError::Failed {
                program: self.program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn traineddata_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{code}.traineddata"))
}

fn list_traineddata(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut langs: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            name.strip_suffix(".traineddata").map(str::to_string)
        })
        .collect();
    langs.sort();
    Ok(langs)
}

/// Parse `tesseract --list-langs` output, skipping the header line.
fn parse_list_langs(text: &str) -> Vec<String> {
    let mut langs: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .filter(|l| !l.contains(' '))
        .map(str::to_string)
        .collect();
    langs.sort();
    langs.dedup();
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_install(langs: &[&str]) -> (tempfile::TempDir, EngineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("tesseract");
        std::fs::write(&exe, b"").unwrap();
        let tessdata = dir.path().join("tessdata");
        std::fs::create_dir(&tessdata).unwrap();
        for l in langs {
            std::fs::write(tessdata.join(format!("{l}.traineddata")), b"").unwrap();
        }
        let engines = EngineConfig {
            tesseract_cmd: exe,
            tessdata_dir: Some(tessdata),
            ..EngineConfig::default()
        };
        (dir, engines)
    }

    #[test]
    fn new_accepts_installed_languages() {
        let (_dir, engines) = fake_install(&["eng", "spa", "cat"]);
        let langs = LanguageSet::default();
        let t = Tesseract::new(&engines, &langs).unwrap();
        assert_eq!(t.available_languages().unwrap(), vec!["cat", "eng", "spa"]);
    }

    #[test]
    fn new_rejects_missing_language() {
        let (_dir, engines) = fake_install(&["eng"]);
        let langs: LanguageSet = "eng+cat".parse().unwrap();
        match Tesseract::new(&engines, &langs).unwrap_err() {
            ExtractError::LanguageNotInstalled { language, location } => {
                assert_eq!(language, "cat");
                assert!(location.unwrap().ends_with("cat.traineddata"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn new_rejects_missing_engine() {
        let (dir, mut engines) = fake_install(&["eng"]);
        engines.tesseract_cmd = dir.path().join("missing-tesseract");
        let err = Tesseract::new(&engines, &"eng".parse().unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::EngineNotFound { .. }));
    }

    #[test]
    fn new_rejects_missing_tessdata() {
        let (dir, mut engines) = fake_install(&["eng"]);
        engines.tessdata_dir = Some(dir.path().join("nope"));
        let err = Tesseract::new(&engines, &"eng".parse().unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::TessdataNotFound { .. }));
    }

    #[test]
    fn locate_skips_language_check() {
        let (_dir, engines) = fake_install(&["eng"]);
        let t = Tesseract::locate(&engines).unwrap();
        assert_eq!(t.available_languages().unwrap(), vec!["eng"]);
        assert!(t.verify_languages(&"eng+spa".parse().unwrap()).is_err());
    }

    #[test]
    fn command_line_shape() {
        let (_dir, engines) = fake_install(&["eng", "spa"]);
        let langs: LanguageSet = "eng+spa".parse().unwrap();
        let t = Tesseract::new(&engines, &langs).unwrap();
        let cmd = t.command(Path::new("/tmp/page-1.png"), &langs);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let tessdata = engines.tessdata_dir.unwrap().display().to_string();
        assert_eq!(
            args,
            vec!["/tmp/page-1.png", "stdout", "--tessdata-dir", &tessdata, "-l", "eng+spa"]
        );
    }

    #[test]
    fn parse_list_langs_skips_header() {
        let out = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\nspa\n";
        assert_eq!(parse_list_langs(out), vec!["eng", "osd", "spa"]);
    }
}

//! Firefox profile management.
//!
//! A profile reaches the driver in one of two forms:
//!
//! | Form | Type | Produced by |
//! |------|------|-------------|
//! | Structured | [`Profile`] | [`Profile::new_temp`], [`Profile::from_path`] |
//! | Serialized | base64 zip `String` | [`Profile::encode`], or supplied by the caller |
//!
//! A serialized profile is decoded with [`Profile::decode`] into a fresh
//! temporary directory. Its `user.js` is parsed back so later preference
//! overrides replace existing values.
//!
//! # Example
//!
//! ```no_run
//! use webdriver_fetch::driver::profile::Profile;
//!
//! # fn example() -> webdriver_fetch::Result<()> {
//! let mut profile = Profile::new_temp()?;
//! profile.set_preference("network.proxy.type", 1);
//!
//! let encoded = profile.encode()?;
//! let restored = Profile::decode(&encoded)?;
//! assert!(restored.preference("network.proxy.type").is_some());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use tempfile::TempDir;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// Firefox preference definitions and serialization.
pub mod preferences;

// ============================================================================
// Re-exports
// ============================================================================

pub use preferences::{FirefoxPreference, PreferenceValue};

// ============================================================================
// Constants
// ============================================================================

/// Header comment for `user.js` file.
const USER_JS_HEADER: &str = "// webdriver-fetch user.js\n\
                              // Generated preferences for page rendering\n\n";

/// Preference file name inside a profile directory.
const USER_JS: &str = "user.js";

/// Files Firefox holds open while running; never packed.
const LOCK_FILES: &[&str] = &["parent.lock", "lock", ".parentlock"];

// ============================================================================
// Profile
// ============================================================================

/// A Firefox profile directory plus the preferences to write into it.
///
/// Temporary profiles are deleted when dropped.
pub struct Profile {
    /// Optional temporary directory handle (keeps temp dir alive).
    _temp_dir: Option<TempDir>,

    /// Path to the profile directory.
    path: PathBuf,

    /// Preferences written to `user.js` on [`Profile::encode`].
    prefs: Vec<FirefoxPreference>,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("path", &self.path)
            .field("temporary", &self._temp_dir.is_some())
            .field("prefs", &self.prefs.len())
            .finish()
    }
}

// ============================================================================
// Profile - Constructors
// ============================================================================

impl Profile {
    /// Creates a new temporary profile seeded with [`Profile::default_prefs`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the temporary directory cannot be created.
    pub fn new_temp() -> Result<Self> {
        let mut profile = Self::empty_temp()?;
        profile.prefs = Self::default_prefs();
        Ok(profile)
    }

    /// Uses an existing profile directory, creating it if missing.
    ///
    /// Preferences already present in its `user.js` are loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the directory cannot be created or its
    /// `user.js` cannot be read.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            fs::create_dir_all(&path).map_err(|e| {
                Error::profile(format!(
                    "Failed to create profile directory at {}: {}",
                    path.display(),
                    e
                ))
            })?;
            debug!(path = %path.display(), "Created profile directory");
        } else {
            debug!(path = %path.display(), "Using existing profile directory");
        }

        let prefs = read_user_js(&path)
            .map_err(|e| Error::profile(format!("Failed to read user.js: {e}")))?;

        Ok(Self {
            _temp_dir: None,
            path,
            prefs,
        })
    }

    /// Decodes a serialized (base64 zip) profile into a temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileDecode`] on invalid base64, a corrupt archive,
    /// or any I/O failure while unpacking.
    pub fn decode(data: &str) -> Result<Self> {
        let bytes = Base64Standard
            .decode(data.trim())
            .map_err(|e| Error::profile_decode(format!("Invalid base64 profile data: {e}")))?;

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::profile_decode(format!("Invalid profile archive: {e}")))?;

        let mut profile = Self::empty_temp().map_err(|e| Error::profile_decode(e.to_string()))?;
        archive
            .extract(&profile.path)
            .map_err(|e| Error::profile_decode(format!("Failed to unpack profile: {e}")))?;

        profile.prefs = read_user_js(&profile.path)
            .map_err(|e| Error::profile_decode(format!("Failed to read user.js: {e}")))?;

        debug!(
            path = %profile.path.display(),
            files = archive.len(),
            prefs = profile.prefs.len(),
            "Decoded serialized profile"
        );

        Ok(profile)
    }

    /// Creates an empty temporary profile.
    fn empty_temp() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("webdriver-fetch-")
            .map_err(|e| Error::profile(format!("Failed to create temp profile: {}", e)))?;

        let path = temp_dir.path().to_path_buf();
        debug!(path = %path.display(), "Created temporary profile");

        Ok(Self {
            _temp_dir: Some(temp_dir),
            path,
            prefs: Vec::new(),
        })
    }
}

// ============================================================================
// Profile - Accessors
// ============================================================================

impl Profile {
    /// Returns the path to the profile directory.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the preferences in write order.
    #[inline]
    #[must_use]
    pub fn preferences(&self) -> &[FirefoxPreference] {
        &self.prefs
    }

    /// Returns the value of a preference, if set.
    #[must_use]
    pub fn preference(&self, key: &str) -> Option<&PreferenceValue> {
        self.prefs.iter().find(|p| p.key == key).map(|p| &p.value)
    }
}

// ============================================================================
// Profile - Preferences
// ============================================================================

impl Profile {
    /// Sets a preference, replacing any existing value for the key.
    pub fn set_preference(&mut self, key: impl Into<String>, value: impl Into<PreferenceValue>) {
        self.apply(FirefoxPreference::new(key, value));
    }

    /// Applies a preference, replacing any existing value for its key.
    pub fn apply(&mut self, pref: FirefoxPreference) {
        match self.prefs.iter_mut().find(|p| p.key == pref.key) {
            Some(existing) => *existing = pref,
            None => self.prefs.push(pref),
        }
    }

    /// Applies several preferences in order.
    pub fn apply_all(&mut self, prefs: impl IntoIterator<Item = FirefoxPreference>) {
        for pref in prefs {
            self.apply(pref);
        }
    }

    /// Writes the current preferences to `user.js`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] if the file cannot be written.
    pub fn write_prefs(&self) -> Result<()> {
        let file_path = self.path.join(USER_JS);

        fs::write(&file_path, self.user_js()).map_err(|e| {
            Error::profile(format!(
                "Failed to write user.js at {}: {}",
                file_path.display(),
                e
            ))
        })?;

        debug!(
            path = %file_path.display(),
            pref_count = self.prefs.len(),
            "Wrote preferences to user.js"
        );

        Ok(())
    }

    /// Renders the current preferences as `user.js` content.
    #[must_use]
    pub fn user_js(&self) -> String {
        let mut content = String::from(USER_JS_HEADER);
        for pref in &self.prefs {
            content.push_str(&pref.to_user_pref_line());
            content.push('\n');
        }
        content
    }

    /// Returns the baseline preferences for an unattended rendering browser.
    ///
    /// Startup prompts, updates and telemetry are disabled so a fresh
    /// browser goes straight to the requested page.
    #[must_use]
    pub fn default_prefs() -> Vec<FirefoxPreference> {
        use preferences::{FirefoxPreference as Pref, PreferenceValue as Val};

        vec![
            // Startup
            Pref::new("browser.startup.page", Val::Int(0))
                .with_comment("0 = blank, 1 = home, 2 = last visited, 3 = resume session"),
            Pref::new("browser.shell.checkDefaultBrowser", Val::Bool(false)),
            Pref::new(
                "browser.startup.homepage_override.mstone",
                Val::String("ignore".into()),
            ),
            Pref::new("browser.sessionstore.resume_from_crash", Val::Bool(false)),
            Pref::new("toolkit.startup.max_resumed_crashes", Val::Int(-1)),
            Pref::new("browser.warnOnQuit", Val::Bool(false))
                .with_comment("Override all other possible prompts when quitting"),
            // Updates
            Pref::new("app.update.auto", Val::Bool(false)),
            Pref::new("app.update.enabled", Val::Bool(false)),
            Pref::new("extensions.update.enabled", Val::Bool(false)),
            // Telemetry
            Pref::new("datareporting.policy.dataSubmissionEnabled", Val::Bool(false)),
            Pref::new("toolkit.telemetry.enabled", Val::Bool(false)),
            Pref::new("toolkit.telemetry.reportingpolicy.firstRun", Val::Bool(false)),
            // Rendering
            Pref::new("dom.disable_open_during_load", Val::Bool(true))
                .with_comment("Block pop-ups opened while the page loads"),
            Pref::new("media.autoplay.default", Val::Int(5)),
        ]
    }
}

// ============================================================================
// Profile - Serialization
// ============================================================================

impl Profile {
    /// Packs the profile directory as a base64 zip.
    ///
    /// This is the form accepted in `moz:firefoxOptions.profile`. The
    /// archived `user.js` is rendered from the in-memory preferences; the
    /// directory itself is only read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Profile`] or [`Error::Zip`] if packing fails.
    pub fn encode(&self) -> Result<String> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip_dir_recursive(&mut zip, &self.path, &self.path, options)?;
        zip.start_file(USER_JS, options)?;
        zip.write_all(self.user_js().as_bytes()).map_err(Error::Io)?;

        let bytes = zip.finish()?.into_inner();
        debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "Packed profile"
        );

        Ok(Base64Standard.encode(bytes))
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Adds every file under `dir` to `zip`, named relative to `root`.
///
/// The root `user.js` and lock files are skipped.
fn zip_dir_recursive(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(Error::Io)? {
        let entry = entry.map_err(Error::Io)?;
        let file_type = entry.file_type().map_err(Error::Io)?;
        let path = entry.path();

        let name = path
            .strip_prefix(root)
            .map_err(|e| Error::profile(format!("Profile entry outside root: {e}")))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if file_type.is_dir() {
            zip.add_directory(name.as_str(), options)?;
            zip_dir_recursive(zip, root, &path, options)?;
        } else if name != USER_JS && !LOCK_FILES.contains(&name.as_str()) {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&fs::read(&path).map_err(Error::Io)?)
                .map_err(Error::Io)?;
        }
    }

    Ok(())
}

/// Reads preferences from `dir/user.js`; a missing file yields none.
fn read_user_js(dir: &Path) -> std::io::Result<Vec<FirefoxPreference>> {
    let path = dir.join(USER_JS);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(FirefoxPreference::parse_user_pref_line)
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

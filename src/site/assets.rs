//! Protected site-level assets
//!
//! Every mirrored host directory receives a favicon and a small set of utility
//! scripts under `templets/`, plus the generated `sitemap.xml`. These files are
//! written once (skip-if-exists) and crawled content mapping to the same local
//! path is never allowed to overwrite them.

use crate::config::SiteAssetsConfig;
use crate::site::path_mapper::{host_dir, map_to_local_path};
use crate::MirrorError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Root-relative href of the favicon
pub const FAVICON_HREF: &str = "/favicon.ico";

/// Directory holding the injected utility scripts
pub const TEMPLETS_DIR: &str = "templets";

/// File name of the generated sitemap
pub const SITEMAP_FILE: &str = "sitemap.xml";

const FAVICON_FILE: &str = "favicon.ico";

/// A 1x1 fully transparent 32-bit icon
const BUILTIN_FAVICON: [u8; 70] = [
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, // ICONDIR
    0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00, // entry: 1x1, 1 plane, 32 bpp
    0x30, 0x00, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00, // 48 bytes at offset 22
    0x28, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, // BITMAPINFOHEADER, width 1
    0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00, // height 2 (xor + and), 32 bpp
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, // BGRA pixel
    0x00, 0x00, 0x00, 0x00, // AND mask row
];

/// A utility script injected into mirrored pages
#[derive(Debug, Clone)]
pub struct UtilityScript {
    /// File name under `templets/`
    pub file: String,
    pub body: Vec<u8>,
    /// Only referenced from the home page
    pub home_only: bool,
}

impl UtilityScript {
    /// Root-relative `src` used in the injected `<script>` tag
    pub fn src(&self) -> String {
        format!("/{}/{}", TEMPLETS_DIR, self.file)
    }
}

/// The favicon and utility scripts written into every host directory
#[derive(Debug, Clone)]
pub struct SiteAssets {
    favicon: Vec<u8>,
    scripts: Vec<UtilityScript>,
}

impl Default for SiteAssets {
    fn default() -> Self {
        Self::builtin(&SiteAssetsConfig::default())
    }
}

impl SiteAssets {
    /// Builds the asset set from configuration, reading operator-supplied files
    pub fn from_config(config: &SiteAssetsConfig) -> Result<Self, MirrorError> {
        let favicon = match &config.favicon {
            Some(path) => std::fs::read(path)?,
            None => BUILTIN_FAVICON.to_vec(),
        };

        let mut scripts = Vec::with_capacity(config.scripts.len());
        for entry in &config.scripts {
            let file = entry.file.trim().to_string();
            let body = match &entry.source {
                Some(path) => std::fs::read(path)?,
                None => placeholder_script(&file),
            };
            scripts.push(UtilityScript {
                file,
                body,
                home_only: entry.home_only,
            });
        }

        Ok(Self { favicon, scripts })
    }

    /// Builds the asset set using built-in contents for every entry
    pub fn builtin(config: &SiteAssetsConfig) -> Self {
        let scripts = config
            .scripts
            .iter()
            .map(|entry| UtilityScript {
                file: entry.file.trim().to_string(),
                body: placeholder_script(entry.file.trim()),
                home_only: entry.home_only,
            })
            .collect();

        Self {
            favicon: BUILTIN_FAVICON.to_vec(),
            scripts,
        }
    }

    pub fn scripts(&self) -> &[UtilityScript] {
        &self.scripts
    }

    /// Scripts referenced from a page; home-only scripts are included only for the home page
    pub fn scripts_for_page(&self, is_home: bool) -> impl Iterator<Item = &UtilityScript> {
        self.scripts.iter().filter(move |s| is_home || !s.home_only)
    }

    /// Local paths that crawled content may never write to
    pub fn protected_paths(&self, host_dir: &Path) -> Vec<PathBuf> {
        let mut paths = vec![host_dir.join(FAVICON_FILE), host_dir.join(SITEMAP_FILE)];
        for script in &self.scripts {
            paths.push(host_dir.join(TEMPLETS_DIR).join(&script.file));
        }
        paths
    }

    /// Returns true if the asset URL maps onto a protected site file
    pub fn is_protected(&self, root: &Path, url: &Url) -> bool {
        let local = map_to_local_path(root, url, false);
        self.protected_paths(&host_dir(root, url))
            .iter()
            .any(|p| p == &local)
    }

    /// Writes the favicon and utility scripts into the host directory of `page_url`
    ///
    /// Existing files are left untouched, so concurrent jobs mirroring the same
    /// host may call this freely.
    pub async fn ensure(&self, root: &Path, page_url: &Url) -> Result<(), MirrorError> {
        let dir = host_dir(root, page_url);
        write_if_absent(&dir.join(FAVICON_FILE), &self.favicon).await?;
        for script in &self.scripts {
            let path = dir.join(TEMPLETS_DIR).join(&script.file);
            write_if_absent(&path, &script.body).await?;
        }
        Ok(())
    }
}

fn placeholder_script(file: &str) -> Vec<u8> {
    format!("/* site-mirror utility script: {} */\n", file).into_bytes()
}

async fn write_if_absent(path: &Path, body: &[u8]) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(mut file) => {
            file.write_all(body).await?;
            file.flush().await?;
            tracing::debug!(path = %path.display(), "wrote site asset");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}

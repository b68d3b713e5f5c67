use std::{
    error, fmt, fs, io,
    path::{Path, PathBuf},
};

use directory::{client::Client, database::Database, RequestError};
use model::pharmacy::Pharmacy;
use serde::Deserialize;

/// Environment variable overriding the manifest location.
pub const MANIFEST_VAR: &str = "SEED_MANIFEST";

pub fn default_manifest_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/manifest.json")
}

#[derive(Debug)]
pub enum SeedError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    Request(RequestError),
}

impl error::Error for SeedError {}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SeedError::Io { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            SeedError::Json { path, source } => {
                write!(f, "could not parse {}: {}", path.display(), source)
            }
            SeedError::Request(why) => write!(f, "could not store pharmacies: {}", why),
        }
    }
}

impl From<RequestError> for SeedError {
    fn from(why: RequestError) -> Self {
        SeedError::Request(why)
    }
}

/// One fixture file and whether its pharmacies are permanently open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub file: PathBuf,
    pub is_24h: bool,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    directory: PathBuf,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let entries = read_json(path)?;
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self { directory, entries })
    }

    /// All pharmacies of all fixtures in manifest order, each tagged with the
    /// `is_24h` flag of its fixture.
    pub fn pharmacies(&self) -> Result<Vec<Pharmacy>, SeedError> {
        let mut all = Vec::new();
        for entry in &self.entries {
            let path = self.directory.join(&entry.file);
            let pharmacies: Vec<Pharmacy> = read_json(&path)?;
            log::info!(
                "{}: {} pharmacies (24h: {})",
                entry.file.display(),
                pharmacies.len(),
                entry.is_24h
            );
            all.extend(tag(pharmacies, entry.is_24h));
        }
        Ok(all)
    }
}

fn tag(pharmacies: Vec<Pharmacy>, is_24h: bool) -> impl Iterator<Item = Pharmacy> {
    pharmacies
        .into_iter()
        .map(move |pharmacy| Pharmacy { is_24h, ..pharmacy })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SeedError> {
    let content = fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SeedError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces the whole pharmacy table with the fixtures of the manifest.
pub async fn run<D: Database>(client: &Client<D>, manifest_path: &Path) -> Result<u64, SeedError> {
    log::info!("seeding from {}", manifest_path.display());
    let manifest = Manifest::load(manifest_path)?;
    let pharmacies = manifest.pharmacies()?;
    log::info!("{} pharmacies loaded", pharmacies.len());

    let inserted = client.replace_all(pharmacies).await?;
    log::info!("seeding successful, {} pharmacies stored", inserted);
    Ok(inserted)
}

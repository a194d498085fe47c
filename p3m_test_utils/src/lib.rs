use std::{
    fs::{self, File},
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::de::from_reader;
use walkdir::WalkDir;

/// Expected contents of a fixture, stored as JSON next to it.
///
/// Every file under the searched directory with the right extension and a sibling
/// `.json` file is decoded and checked against the deserialized spec.
pub trait FileSpec
where
    for<'de> Self: Deserialize<'de>,
{
    type Type;

    fn extension() -> &'static str;

    fn decode(bytes: &[u8]) -> Self::Type;

    fn verify(&self, data: Self::Type);

    /// Returns the number of fixtures verified.
    fn verify_from_path(path: &Path) -> usize {
        let mut verified = 0;

        for fixture in discover_test_files(path, Self::extension()) {
            let Some(spec) = read_spec::<Self>(&fixture.path.with_extension("json")) else {
                eprintln!("No spec for {}, skipping", fixture.name);
                continue;
            };

            eprintln!("Verifying {}", fixture.name);
            let bytes = fs::read(&fixture.path).unwrap();
            spec.verify(Self::decode(&bytes));
            verified += 1;
        }

        verified
    }
}

fn read_spec<S>(path: &Path) -> Option<S>
where
    for<'de> S: Deserialize<'de>,
{
    match File::open(path) {
        Ok(file) => Some(from_reader(BufReader::new(file)).unwrap()),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => panic!("failed to open `{}`: {}", path.display(), err),
    }
}

pub struct TestFile {
    /// Path relative to the searched directory, without the extension.
    pub name: String,
    pub path: PathBuf,
}

pub fn discover_test_files(path: &Path, extension: &str) -> Vec<TestFile> {
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(path).unwrap();
            let name = relative.to_string_lossy().strip_suffix(extension)?.to_owned();

            Some(TestFile {
                name,
                path: entry.into_path(),
            })
        })
        .collect()
}

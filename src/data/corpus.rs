use std::path::{Path, PathBuf};

use itertools::Itertools;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Where the raw text comes from.
#[derive(Debug, Clone)]
pub enum Corpus {
    /// A directory of XML documents, one document per file.
    XmlDir(PathBuf),
    /// A plain-text file; blank-line separated paragraphs are the documents.
    TextFile(PathBuf),
}

impl Corpus {
    /// Pick the corpus kind from what is on disk.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Ok(Corpus::XmlDir(path.to_path_buf()))
        } else if path.is_file() {
            Ok(Corpus::TextFile(path.to_path_buf()))
        } else {
            Err(Error::CorpusNotFound(path.to_path_buf()))
        }
    }

    /// Read the documents of the corpus, in enumeration order.
    pub fn documents(&self) -> Result<Vec<String>> {
        match self {
            Corpus::XmlDir(dir) => read_texts_from_xml_dir(dir),
            Corpus::TextFile(path) => read_paragraphs(path),
        }
    }
}

/// Extract the paragraphs of an XML document.
///
/// The text is the content of each `<p>` under the first `<text>` child of the
/// root, joined with a space. Anything unexpected yields an empty string.
pub fn read_text_from_xml<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    match try_read_text_from_xml(path) {
        Ok(text) => text,
        Err(reason) => {
            debug!(path = %path.display(), %reason, "skipping document");
            String::new()
        }
    }
}

/// Element named `name` outside any namespace.
fn is_plain_element(node: &roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace().is_none() && node.tag_name().name() == name
}

fn try_read_text_from_xml(path: &Path) -> std::result::Result<String, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let document = roxmltree::Document::parse(&content).map_err(|e| e.to_string())?;

    let text = document
        .root_element()
        .children()
        .find(|n| is_plain_element(n, "text"))
        .ok_or("no <text> element")?;

    let paragraphs = text
        .children()
        .filter(|n| is_plain_element(n, "p"))
        .map(|p| p.text().ok_or("<p> without text"))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(paragraphs.into_iter().join(" "))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::CorpusNotFound(dir.to_path_buf()));
    }
    let mut paths = std::fs::read_dir(dir)
        .map_err(Error::path(dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(Error::path(dir))?;
    paths.sort();
    Ok(paths)
}

/// Extract the text of every file in `dir`, sorted by file name.
///
/// Files that cannot be parsed give an empty string and are kept in place.
pub fn read_texts_from_xml_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
    let paths = sorted_entries(dir.as_ref())?;
    info!(dir = %dir.as_ref().display(), files = paths.len(), "reading XML corpus");

    // order of the output follows the order of the paths
    let texts: Vec<String> = paths.par_iter().map(read_text_from_xml).collect();

    let empty = texts.iter().filter(|t| t.is_empty()).count();
    if empty > 0 {
        info!(empty, "documents without text will be skipped");
    }
    Ok(texts)
}

/// Split a text file into paragraphs.
///
/// Paragraphs are separated by blank lines; the lines of a paragraph are
/// trimmed and joined with a space.
pub fn read_paragraphs<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(Error::path(path))?;
    Ok(split_paragraphs(&content))
}

pub(crate) fn split_paragraphs(content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs
}

#[derive(Deserialize)]
struct NewspaperFile {
    document: Vec<NewspaperDocument>,
}

#[derive(Deserialize)]
struct NewspaperDocument {
    #[serde(default)]
    paragraph: Vec<Sentence>,
}

#[derive(Deserialize)]
struct Sentence {
    form: String,
}

/// Flatten a directory of JSON newspaper files into one text file.
///
/// Every `*.json` file holds `document[].paragraph[].form`; sentences are
/// written one per line. Returns the number of sentences written.
pub fn json_corpus_to_text<P: AsRef<Path>, Q: AsRef<Path>>(dir: P, out: Q) -> Result<usize> {
    let paths = sorted_entries(dir.as_ref())?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "json"));

    let mut files = Vec::new();
    let mut n_sentences = 0;
    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(Error::path(&path))?;
        let parsed: NewspaperFile = serde_json::from_str(&content)?;
        let sentences = parsed
            .document
            .iter()
            .flat_map(|d| d.paragraph.iter())
            .map(|s| s.form.as_str())
            .collect::<Vec<_>>();
        debug!(path = %path.display(), sentences = sentences.len(), "read newspaper file");
        n_sentences += sentences.len();
        files.push(sentences.join("\n"));
    }

    let out = out.as_ref();
    std::fs::write(out, files.join("\n")).map_err(Error::path(out))?;
    info!(out = %out.display(), sentences = n_sentences, "wrote text corpus");
    Ok(n_sentences)
}

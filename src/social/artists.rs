use std::collections::{HashMap, HashSet};

use crate::backend::models::Snippet;

/// Shown on the profile summary; the full list is available on demand.
pub const TOP_ARTISTS_SUMMARY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonArtist {
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopArtist {
    pub name: String,
    pub image_url: String,
    pub count: usize,
}

fn snippet_image(s: &Snippet) -> Option<String> {
    [&s.artist_art_url, &s.album_art_url]
        .into_iter()
        .flatten()
        .find(|u| !u.is_empty())
        .cloned()
}

/// Artists on `theirs` that also appear on `mine`, in `theirs` order, each
/// with the image from its first snippet.
pub fn artists_in_common(theirs: &[Snippet], mine: &[Snippet]) -> Vec<CommonArtist> {
    let my_names: HashSet<&str> = mine.iter().map(|s| s.artist_name.as_str()).collect();
    let mut seen = HashSet::new();
    theirs
        .iter()
        .filter(|s| seen.insert(s.artist_name.as_str()))
        .filter(|s| my_names.contains(s.artist_name.as_str()))
        .map(|s| CommonArtist {
            name: s.artist_name.clone(),
            image_url: snippet_image(s),
        })
        .collect()
}

/// Artists by snippet count, most first. Ties keep first-appearance order.
pub fn top_artists(snippets: &[Snippet]) -> Vec<TopArtist> {
    let mut order: Vec<TopArtist> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for s in snippets {
        match index.get(s.artist_name.as_str()) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(&s.artist_name, order.len());
                order.push(TopArtist {
                    name: s.artist_name.clone(),
                    image_url: snippet_image(s).unwrap_or_default(),
                    count: 1,
                });
            }
        }
    }
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order
}

/// "1 snippet", "3 snippets".
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

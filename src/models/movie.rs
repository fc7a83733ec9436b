use serde::{Deserialize, Deserializer, Serialize};

use super::MovieId;

/// A catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    #[serde(alias = "movieId")]
    pub movie_id: MovieId,
    pub title: String,
    /// Accepts a JSON array or a MovieLens pipe-joined string
    #[serde(default, deserialize_with = "deserialize_genres")]
    pub genres: Vec<String>,
}

impl Movie {
    /// Case-insensitive substring match against any genre
    pub fn has_genre(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.genres.iter().any(|g| g.to_lowercase().contains(&needle))
    }

    /// Case-insensitive substring match against the title
    pub fn title_contains(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenreField {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_genres<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let genres = match GenreField::deserialize(deserializer)? {
        GenreField::List(list) => list,
        GenreField::Joined(joined) => joined.split('|').map(str::to_string).collect(),
    };

    Ok(genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && g != "(no genres listed)")
        .collect())
}

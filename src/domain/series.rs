use serde::{Deserialize, Serialize};

use super::id_from_href;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub href: String,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: String::new(),
        }
    }

    /// Author id, when the listing linked the author page.
    pub fn id(&self) -> Option<String> {
        (!self.href.is_empty()).then(|| id_from_href(&self.href))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub id: String,
    #[serde(default)]
    pub href: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default, alias = "numEpisodes")]
    pub episode_count: Option<u32>,
}

impl SeriesSummary {
    pub fn from_href(href: impl Into<String>, title: impl Into<String>, authors: Vec<Author>) -> Self {
        let href = href.into();
        Self {
            id: id_from_href(&href),
            href,
            title: title.into(),
            authors,
            episode_count: None,
        }
    }

    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookshelfEntry {
    pub id: String,
    #[serde(default)]
    pub href: String,
    pub title: String,
    #[serde(default)]
    pub last_update: String,
}

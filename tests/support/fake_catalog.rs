//! In-memory catalog that models the remote's favorite toggling.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use archiver_core::catalog::{
    Catalog, CatalogError, ComicDetail, ComicPage, ComicSummary, Episode, EpisodePage, PageImage,
};
use async_trait::async_trait;

#[derive(Default)]
struct State {
    comics: HashMap<String, ComicDetail>,
    favorite_order: Vec<String>,
    search_pages: HashMap<String, Vec<Vec<String>>>,
    episodes: HashMap<String, Vec<Episode>>,
    images: HashMap<(String, u32), Vec<String>>,
    favorite_calls: Vec<String>,
    search_requests: Vec<(String, u32)>,
    reject_session: bool,
    endless_images: HashSet<String>,
}

#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a comic with its episodes as `(order, title, image urls)`.
    pub fn add_comic(&self, detail: ComicDetail, episodes: Vec<(u32, &str, Vec<String>)>) {
        let mut state = self.state.lock().unwrap();
        let id = detail.id.clone();
        if detail.is_favourite {
            state.favorite_order.push(id.clone());
        }
        let mut listed = Vec::new();
        for (order, title, urls) in episodes {
            listed.push(Episode {
                id: format!("{id}-ep{order}"),
                title: title.to_string(),
                order,
            });
            state.images.insert((id.clone(), order), urls);
        }
        state.episodes.insert(id.clone(), listed);
        state.comics.insert(id, detail);
    }

    /// Sets the search result pages (comic ids, newest first) for a keyword.
    pub fn set_search_pages(&self, keyword: &str, pages: Vec<Vec<&str>>) {
        let pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(str::to_string).collect())
            .collect();
        self.state
            .lock()
            .unwrap()
            .search_pages
            .insert(keyword.to_string(), pages);
    }

    /// Makes every image page of `comic_id` non-empty, so listings never end.
    pub fn endless_image_pages(&self, comic_id: &str) {
        self.state
            .lock()
            .unwrap()
            .endless_images
            .insert(comic_id.to_string());
    }

    pub fn reject_session(&self) {
        self.state.lock().unwrap().reject_session = true;
    }

    pub fn favorite_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().favorite_calls.clone()
    }

    pub fn search_requests(&self) -> Vec<(String, u32)> {
        self.state.lock().unwrap().search_requests.clone()
    }

    pub fn is_favourite(&self, comic_id: &str) -> bool {
        self.state.lock().unwrap().comics[comic_id].is_favourite
    }
}

pub fn detail(id: &str, title: &str, finished: bool, favourite: bool, updated_at: &str) -> ComicDetail {
    ComicDetail {
        id: id.to_string(),
        title: title.to_string(),
        author: "author".to_string(),
        categories: vec!["全彩".to_string()],
        pages_count: 10,
        eps_count: 2,
        finished,
        updated_at: updated_at.to_string(),
        is_favourite: favourite,
    }
}

fn summary(detail: &ComicDetail) -> ComicSummary {
    ComicSummary {
        id: detail.id.clone(),
        title: detail.title.clone(),
        author: detail.author.clone(),
        categories: detail.categories.clone(),
        pages_count: Some(detail.pages_count),
        eps_count: Some(detail.eps_count),
        finished: detail.finished,
    }
}

fn not_found(endpoint: String) -> CatalogError {
    CatalogError::Api {
        endpoint,
        code: 400,
        message: "not found".to_string(),
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn list_favorites(&self, page: u32) -> Result<ComicPage, CatalogError> {
        let state = self.state.lock().unwrap();
        if state.reject_session {
            return Err(CatalogError::Auth {
                message: "session expired".to_string(),
            });
        }
        let docs = if page == 1 {
            state
                .favorite_order
                .iter()
                .map(|id| summary(&state.comics[id]))
                .collect()
        } else {
            Vec::new()
        };
        Ok(ComicPage { docs, pages: 1 })
    }

    async fn search_comics(&self, keyword: &str, page: u32) -> Result<ComicPage, CatalogError> {
        let mut state = self.state.lock().unwrap();
        state.search_requests.push((keyword.to_string(), page));
        let pages = state.search_pages.get(keyword).cloned().unwrap_or_default();
        let docs = pages
            .get((page - 1) as usize)
            .map(|ids| ids.iter().map(|id| summary(&state.comics[id])).collect())
            .unwrap_or_default();
        Ok(ComicPage {
            docs,
            pages: u32::try_from(pages.len().max(1)).unwrap(),
        })
    }

    async fn list_episodes(&self, comic_id: &str, page: u32) -> Result<EpisodePage, CatalogError> {
        let state = self.state.lock().unwrap();
        let episodes = state
            .episodes
            .get(comic_id)
            .ok_or_else(|| not_found(format!("comics/{comic_id}/eps")))?;
        // Remote lists newest first.
        let mut docs = episodes.clone();
        docs.reverse();
        Ok(EpisodePage {
            docs: if page == 1 { docs } else { Vec::new() },
            pages: 1,
            total: u32::try_from(episodes.len()).unwrap(),
        })
    }

    async fn list_page_images(
        &self,
        comic_id: &str,
        order: u32,
        page: u32,
    ) -> Result<Vec<PageImage>, CatalogError> {
        let state = self.state.lock().unwrap();
        if page > 1 && !state.endless_images.contains(comic_id) {
            return Ok(Vec::new());
        }
        Ok(state
            .images
            .get(&(comic_id.to_string(), order))
            .map(|urls| {
                urls.iter()
                    .map(|url| PageImage { url: url.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_comic_metadata(&self, comic_id: &str) -> Result<ComicDetail, CatalogError> {
        self.state
            .lock()
            .unwrap()
            .comics
            .get(comic_id)
            .cloned()
            .ok_or_else(|| not_found(format!("comics/{comic_id}")))
    }

    async fn set_favorite(&self, comic_id: &str) -> Result<(), CatalogError> {
        let mut state = self.state.lock().unwrap();
        state.favorite_calls.push(comic_id.to_string());
        let comic = state
            .comics
            .get_mut(comic_id)
            .ok_or_else(|| not_found(format!("comics/{comic_id}/favourite")))?;
        comic.is_favourite = !comic.is_favourite;
        let now_favourite = comic.is_favourite;
        if now_favourite {
            state.favorite_order.push(comic_id.to_string());
        } else {
            state.favorite_order.retain(|id| id != comic_id);
        }
        Ok(())
    }
}

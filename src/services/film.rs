//! Film library service
//!
//! Thematics, movies and movie images. Unlike the catalog, deletes cascade:
//! removing a thematic removes its movies, removing a movie removes its
//! image rows. Image files are not known to the database, so the service
//! collects their names before the delete and removes them afterwards.

use serde::Deserialize;
use std::sync::Arc;

use super::error::ServiceError;
use super::file_store::{FileStore, Upload, MOVIE_IMAGES};
use super::validation;
use crate::config::ListingConfig;
use crate::db::repositories::Repository;
use crate::models::{Movie, MovieImage, Thematic};
use crate::pager::Page;

/// Input for creating or renaming a thematic
#[derive(Debug, Clone, Deserialize)]
pub struct ThematicInput {
    pub name: String,
}

/// Input for creating or updating a movie
#[derive(Debug, Clone, Deserialize)]
pub struct MovieInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub thematic_id: i64,
}

pub struct FilmService {
    thematics: Arc<dyn Repository<Thematic>>,
    movies: Arc<dyn Repository<Movie>>,
    images: Arc<dyn Repository<MovieImage>>,
    files: Arc<dyn FileStore>,
    listing: ListingConfig,
}

impl FilmService {
    pub fn new(
        thematics: Arc<dyn Repository<Thematic>>,
        movies: Arc<dyn Repository<Movie>>,
        images: Arc<dyn Repository<MovieImage>>,
        files: Arc<dyn FileStore>,
        listing: ListingConfig,
    ) -> Self {
        Self {
            thematics,
            movies,
            images,
            files,
            listing,
        }
    }

    pub async fn list_thematics(&self) -> Result<Vec<Thematic>, ServiceError> {
        Ok(self.thematics.get_all().await?)
    }

    pub async fn get_thematic(&self, id: i64) -> Result<Thematic, ServiceError> {
        self.thematics
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Thematic", id))
    }

    pub async fn create_thematic(&self, input: ThematicInput) -> Result<Thematic, ServiceError> {
        let name = validation::required("Name", &input.name)?;
        let thematic = self.thematics.add(&Thematic::new(name)).await?;
        tracing::info!("Created thematic {} ({})", thematic.id, thematic.slug);
        Ok(thematic)
    }

    pub async fn update_thematic(
        &self,
        id: i64,
        input: ThematicInput,
    ) -> Result<Thematic, ServiceError> {
        self.get_thematic(id).await?;
        let name = validation::required("Name", &input.name)?;
        let mut thematic = Thematic::new(name);
        thematic.id = id;
        Ok(self.thematics.update(&thematic).await?)
    }

    /// Delete a thematic with its movies, their images and the image files
    pub async fn delete_thematic(&self, id: i64) -> Result<(), ServiceError> {
        self.get_thematic(id).await?;

        let mut files = Vec::new();
        for movie in self.movies.get_all_by_parent(id).await? {
            files.extend(self.image_files(movie.id).await?);
        }

        self.thematics.delete(id).await?;
        self.remove_files(&files).await;
        tracing::info!("Deleted thematic {} and {} image files", id, files.len());
        Ok(())
    }

    pub async fn list_movies(&self, page: i64) -> Result<Page<Movie>, ServiceError> {
        Ok(self
            .movies
            .get_paged(page, self.listing.movies_per_page)
            .await?)
    }

    pub async fn all_movies(&self) -> Result<Vec<Movie>, ServiceError> {
        Ok(self.movies.get_all().await?)
    }

    pub async fn search_movies(&self, term: &str, page: i64) -> Result<Page<Movie>, ServiceError> {
        Ok(self
            .movies
            .get_paged_by_search(term, page, self.listing.movies_per_page)
            .await?)
    }

    pub async fn movies_by_thematic(
        &self,
        thematic_id: i64,
        page: i64,
    ) -> Result<(Thematic, Page<Movie>), ServiceError> {
        let thematic = self.get_thematic(thematic_id).await?;
        let movies = self
            .movies
            .get_paged_by_parent(thematic_id, page, self.listing.movies_per_page)
            .await?;
        Ok((thematic, movies))
    }

    pub async fn get_movie(&self, id: i64) -> Result<Movie, ServiceError> {
        self.movies
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Movie", id))
    }

    pub async fn create_movie(&self, input: MovieInput) -> Result<Movie, ServiceError> {
        let movie = self.validate_movie(input).await?;
        let movie = self.movies.add(&movie).await?;
        tracing::info!("Created movie {} ({})", movie.id, movie.slug);
        Ok(movie)
    }

    pub async fn update_movie(&self, id: i64, input: MovieInput) -> Result<Movie, ServiceError> {
        self.get_movie(id).await?;
        let mut movie = self.validate_movie(input).await?;
        movie.id = id;
        Ok(self.movies.update(&movie).await?)
    }

    pub async fn delete_movie(&self, id: i64) -> Result<(), ServiceError> {
        self.get_movie(id).await?;
        let files = self.image_files(id).await?;
        self.movies.delete(id).await?;
        self.remove_files(&files).await;
        tracing::info!("Deleted movie {}", id);
        Ok(())
    }

    async fn validate_movie(&self, input: MovieInput) -> Result<Movie, ServiceError> {
        let name = validation::required("Name", &input.name)?;
        let description = validation::required("Description", &input.description)?;
        if self.thematics.get_by_id(input.thematic_id).await?.is_none() {
            return Err(ServiceError::Validation(format!(
                "Thematic {} does not exist",
                input.thematic_id
            )));
        }
        Ok(Movie::new(name, description, input.thematic_id))
    }

    pub async fn movie_images(
        &self,
        movie_id: i64,
    ) -> Result<(Movie, Vec<MovieImage>), ServiceError> {
        let movie = self.get_movie(movie_id).await?;
        let images = self.images.get_all_by_parent(movie_id).await?;
        Ok((movie, images))
    }

    pub async fn add_movie_image(
        &self,
        movie_id: i64,
        upload: &Upload,
    ) -> Result<MovieImage, ServiceError> {
        self.get_movie(movie_id).await?;

        let name = self.files.save(MOVIE_IMAGES, upload).await?;
        match self.images.add(&MovieImage::new(name.clone(), movie_id)).await {
            Ok(image) => Ok(image),
            Err(e) => {
                self.remove_files(&[name]).await;
                Err(e.into())
            }
        }
    }

    pub async fn delete_movie_image(&self, id: i64) -> Result<MovieImage, ServiceError> {
        let image = self
            .images
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Movie image", id))?;

        self.images.delete(id).await?;
        if let Some(name) = image.name.clone() {
            self.remove_files(&[name]).await;
        }
        Ok(image)
    }

    async fn image_files(&self, movie_id: i64) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .images
            .get_all_by_parent(movie_id)
            .await?
            .into_iter()
            .filter_map(|image| image.name)
            .collect())
    }

    /// Best effort; rows are already gone when this runs
    async fn remove_files(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.files.remove(MOVIE_IMAGES, name).await {
                tracing::warn!("Failed to remove image file {}: {}", name, e);
            }
        }
    }
}

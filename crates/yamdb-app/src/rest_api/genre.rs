#[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
use yamdb_dal::genre::{CreateGenre, Genre, GenreRepository};
use yamdb_types::Resource;

crate::taxonomy_api!(
    GenreRepository,
    CreateGenre,
    Genre,
    Resource::Genre,
    tag = "Genres",
    operations = ("listGenres", "createGenre", "deleteGenre"),
);

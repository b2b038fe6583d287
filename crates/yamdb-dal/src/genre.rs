crate::taxonomy::taxonomy_repository!(
    table = "genre",
    label = "Genre",
    create = CreateGenre,
    record = Genre,
    repository = GenreRepository,
    repository_impl = GenreRepositoryImpl,
);

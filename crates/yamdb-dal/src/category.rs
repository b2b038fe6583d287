crate::taxonomy::taxonomy_repository!(
    table = "category",
    label = "Category",
    create = CreateCategory,
    record = Category,
    repository = CategoryRepository,
    repository_impl = CategoryRepositoryImpl,
);

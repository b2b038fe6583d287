#[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
use yamdb_dal::category::{Category, CategoryRepository, CreateCategory};
use yamdb_types::Resource;

crate::taxonomy_api!(
    CategoryRepository,
    CreateCategory,
    Category,
    Resource::Category,
    tag = "Categories",
    operations = ("listCategories", "createCategory", "deleteCategory"),
);

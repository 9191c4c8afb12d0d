pub mod audit_logs;
pub mod categories;
pub mod customers;
pub mod ingredients;
pub mod inventory_imports;
pub mod order_items;
pub mod orders;
pub mod product_variants;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use customers::Entity as Customers;
pub use ingredients::Entity as Ingredients;
pub use inventory_imports::Entity as InventoryImports;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use users::Entity as Users;

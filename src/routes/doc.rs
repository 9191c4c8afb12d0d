use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        customers::{CreateCustomerRequest, CustomerList, UpdateCustomerRequest},
        ingredients::{CreateIngredientRequest, IngredientList, UpdateIngredientRequest},
        inventory::{CreateImportRequest, ImportList, ImportStats, UpdateImportRequest},
        orders::{
            CreateOrderRequest, OrderItemRequest, OrderList, OrderSortBy, UpcomingOrders,
            UpdateOrderRequest,
        },
        products::{
            CreateProductRequest, CreateVariantRequest, ProductList, UpdateProductRequest,
            UpdateVariantRequest, UpsertVariantRequest,
        },
        reports::{
            CostReport, DailyRevenue, DailyRevenueReport, OrderStatusCounts, OrdersStatsReport,
            ProfitReport, RevenueReport, TopProduct, TopProductsReport,
        },
        users::{CreateUserRequest, UpdateUserRequest, UserList},
    },
    entity::{orders::OrderStatus, users::Role},
    error::ErrorData,
    middleware::auth::TOKEN_COOKIE,
    models::{
        Category, CategorySummary, Customer, CustomerSummary, Ingredient, IngredientSummary,
        InventoryImport, Order, OrderItem, Product, ProductSummary, ProductVariant, User,
        UserSummary, VariantSummary,
    },
    response::{ApiResponse, MessageData, Meta},
    routes::{
        auth, categories, customers, export, health, ingredients, inventory, orders,
        params::{Pagination, SortOrder},
        products, reports, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "cookie_auth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(TOKEN_COOKIE))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::change_password,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::create_variant,
        products::update_variant,
        products::delete_variant,
        ingredients::list_ingredients,
        ingredients::list_active_ingredients,
        ingredients::get_ingredient,
        ingredients::create_ingredient,
        ingredients::update_ingredient,
        ingredients::delete_ingredient,
        inventory::list_imports,
        inventory::import_stats,
        inventory::get_import,
        inventory::create_import,
        inventory::update_import,
        inventory::delete_import,
        customers::list_customers,
        customers::get_customer,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
        orders::list_orders,
        orders::upcoming_orders,
        orders::get_order,
        orders::create_order,
        orders::update_order,
        orders::delete_order,
        reports::revenue,
        reports::costs,
        reports::profit,
        reports::orders_stats,
        reports::top_products,
        reports::daily_revenue,
        export::export_orders,
        export::export_revenue,
        export::export_customers,
        export::export_products,
        export::export_inventory_imports
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            User,
            UserSummary,
            Category,
            CategorySummary,
            Product,
            ProductSummary,
            ProductVariant,
            VariantSummary,
            Ingredient,
            IngredientSummary,
            InventoryImport,
            Customer,
            CustomerSummary,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            ChangePasswordRequest,
            AuthResponse,
            CreateUserRequest,
            UpdateUserRequest,
            UserList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateProductRequest,
            CreateVariantRequest,
            UpsertVariantRequest,
            UpdateProductRequest,
            UpdateVariantRequest,
            ProductList,
            CreateIngredientRequest,
            UpdateIngredientRequest,
            IngredientList,
            CreateImportRequest,
            UpdateImportRequest,
            ImportList,
            ImportStats,
            CreateCustomerRequest,
            UpdateCustomerRequest,
            CustomerList,
            OrderItemRequest,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderSortBy,
            OrderList,
            UpcomingOrders,
            RevenueReport,
            CostReport,
            ProfitReport,
            OrderStatusCounts,
            OrdersStatsReport,
            TopProduct,
            TopProductsReport,
            DailyRevenue,
            DailyRevenueReport,
            Pagination,
            SortOrder,
            Meta,
            MessageData,
            ErrorData,
            ApiResponse<ErrorData>
        )
    ),
    security(
        ("bearer_auth" = []),
        ("cookie_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness check"),
        (name = "Auth", description = "Registration, login and session"),
        (name = "Users", description = "Staff account management, admin only"),
        (name = "Categories", description = "Product categories"),
        (name = "Products", description = "Products and their sellable variants"),
        (name = "Ingredients", description = "Raw ingredients kept in stock"),
        (name = "Inventory", description = "Ingredient stock imports"),
        (name = "Customers", description = "Customer directory"),
        (name = "Orders", description = "Orders and delivery schedule"),
        (name = "Reports", description = "Revenue, cost and sales reports, admin only"),
        (name = "Export", description = "Excel workbook downloads, admin only"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_both_security_schemes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.security_schemes.contains_key("cookie_auth"));
    }

    #[test]
    fn literal_paths_are_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/ingredients/active",
            "/api/inventory-imports/stats",
            "/api/orders/upcoming",
            "/api/reports/daily-revenue",
            "/api/export/inventory-imports",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

// Route path constants - single source of truth for all administrative API paths

pub const HEALTH: &str = "/health";
pub const PING: &str = "/ping";
pub const ROUTES: &str = "/routes";
pub const ROUTES_SUMMARY: &str = "/routes/summary";
pub const ROUTE_ITEM: &str = "/routes/{id}";
pub const FOLDER_SHARES: &str = "/folders/shares";
pub const FOLDER_SHARE: &str = "/folders/share";
pub const USERS_ME: &str = "/users/me";
pub const USERS_SEARCH: &str = "/users/search";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";

/// Prefixes whose whole subtree is claimed by administrative endpoints
pub const RESERVED_PREFIXES: &[&str] = &[ROUTES, SWAGGER_UI, "/api-docs"];

/// Administrative endpoints matched exactly; paths below them stay free for mock routes
pub const RESERVED_PATHS: &[&str] = &[
    HEALTH,
    PING,
    FOLDER_SHARES,
    FOLDER_SHARE,
    USERS_ME,
    USERS_SEARCH,
];

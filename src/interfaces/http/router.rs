//! API Router with Swagger UI

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::notifications::NotificationDispatcher;
use crate::application::services::{
    AuthService, OccupancyService, ParkingSlotService, UserService, VehicleService,
};
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, require_admin, AuthState};
use crate::interfaces::http::modules::{
    auth, health, metrics, parking_requests, parking_slots, request_id, users, vehicles,
};
use crate::shared::clock::SharedClock;

/// Application services shared by all handlers. Built once at startup.
#[derive(Clone)]
pub struct ApiServices {
    pub repos: Arc<dyn RepositoryProvider>,
    pub auth: Arc<AuthService>,
    pub slots: Arc<ParkingSlotService>,
    pub occupancy: Arc<OccupancyService>,
    pub vehicles: Arc<VehicleService>,
    pub users: Arc<UserService>,
}

impl ApiServices {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        clock: SharedClock,
        jwt_config: JwtConfig,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self::from_auth(
            repos.clone(),
            clock.clone(),
            AuthService::new(repos, jwt_config, clock),
            notifications,
        )
    }

    /// Same as [`ApiServices::new`] around a pre-configured [`AuthService`].
    pub fn from_auth(
        repos: Arc<dyn RepositoryProvider>,
        clock: SharedClock,
        auth: AuthService,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            auth: Arc::new(auth),
            slots: Arc::new(ParkingSlotService::new(repos.clone(), clock.clone())),
            occupancy: Arc::new(
                OccupancyService::new(repos.clone(), clock.clone())
                    .with_notifications(notifications),
            ),
            vehicles: Arc::new(VehicleService::new(repos.clone(), clock.clone())),
            users: Arc::new(UserService::new(repos.clone(), clock)),
            repos,
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::register,
        auth::get_current_user,
        auth::change_password,
        // Users
        users::list_users,
        users::search_users,
        users::delete_user,
        users::update_profile,
        users::delete_own_account,
        // Parking slots
        parking_slots::create_slot,
        parking_slots::list_slots,
        parking_slots::get_slot,
        parking_slots::update_slot,
        parking_slots::delete_slot,
        parking_slots::record_entry,
        parking_slots::record_exit,
        parking_slots::active_parkings,
        parking_slots::parking_report,
        // Parking requests
        parking_requests::create_request,
        parking_requests::list_requests,
        parking_requests::my_requests,
        parking_requests::get_request,
        parking_requests::update_request,
        parking_requests::delete_request,
        parking_requests::approve_request,
        parking_requests::reject_request,
        // Vehicles
        vehicles::create_vehicle,
        vehicles::list_vehicles,
        vehicles::get_vehicle,
        vehicles::update_vehicle,
        vehicles::delete_vehicle,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::UserInfo,
            auth::ChangePasswordRequest,
            // Users
            users::UserDto,
            users::UpdateProfileRequest,
            // Parking slots
            parking_slots::ParkingSlotDto,
            parking_slots::CreateSlotRequest,
            parking_slots::UpdateSlotRequest,
            parking_slots::GateEventRequest,
            parking_slots::ExitDto,
            parking_slots::ReportRequest,
            parking_slots::ReportDto,
            parking_slots::ReportSummaryDto,
            // Parking requests
            parking_requests::ParkingRequestDto,
            parking_requests::CreateParkingRequest,
            parking_requests::UpdateParkingRequest,
            parking_requests::ApprovalDto,
            // Vehicles
            vehicles::VehicleDto,
            vehicles::CreateVehicleRequest,
            vehicles::UpdateVehicleRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Authentication", description = "Registration, login (JWT) and profile"),
        (name = "Parking Slots", description = "Slot administration, gate entry/exit, active sessions and reports"),
        (name = "Parking Requests", description = "Request-then-approve workflow"),
        (name = "Vehicles", description = "Vehicle registry"),
        (name = "Users", description = "User administration and own profile"),
    ),
    info(
        title = "Parking Service API",
        version = "1.0.0",
        description = "REST API for parking slots, vehicle entries and exits, billing and parking requests",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes.
///
/// `/metrics` is only mounted when a Prometheus handle is given.
pub fn create_api_router(services: ApiServices, metrics_handle: Option<PrometheusHandle>) -> Router {
    let auth_state = AuthState {
        jwt_config: services.auth.jwt_config().clone(),
    };
    let authenticated = middleware::from_fn_with_state(auth_state, auth_middleware);

    // Auth: login and register are public, /me is not
    let auth_state = auth::AuthHandlerState {
        auth: services.auth.clone(),
    };
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/change-password", post(auth::change_password))
        .route_layer(authenticated.clone());
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .merge(auth_protected_routes)
        .with_state(auth_state);

    // Parking slots
    let slot_state = parking_slots::ParkingSlotHandlerState {
        slots: services.slots.clone(),
        occupancy: services.occupancy.clone(),
    };
    let slot_admin_routes = Router::new()
        .route("/", post(parking_slots::create_slot))
        .route(
            "/{id}",
            put(parking_slots::update_slot).delete(parking_slots::delete_slot),
        )
        .route("/report", post(parking_slots::parking_report))
        .route_layer(middleware::from_fn(require_admin));
    let slot_routes = Router::new()
        .route("/", get(parking_slots::list_slots))
        .route("/active", get(parking_slots::active_parkings))
        .route("/entry", post(parking_slots::record_entry))
        .route("/exit", post(parking_slots::record_exit))
        .route("/{id}", get(parking_slots::get_slot))
        .merge(slot_admin_routes)
        .route_layer(authenticated.clone())
        .with_state(slot_state);

    // Parking requests
    let request_state = parking_requests::ParkingRequestHandlerState {
        occupancy: services.occupancy.clone(),
    };
    let request_admin_routes = Router::new()
        .route("/", get(parking_requests::list_requests))
        .route(
            "/{id}",
            put(parking_requests::update_request).delete(parking_requests::delete_request),
        )
        .route("/approve/{id}", put(parking_requests::approve_request))
        .route("/reject/{id}", put(parking_requests::reject_request))
        .route_layer(middleware::from_fn(require_admin));
    let request_routes = Router::new()
        .route("/", post(parking_requests::create_request))
        .route("/mine", get(parking_requests::my_requests))
        .route("/{id}", get(parking_requests::get_request))
        .merge(request_admin_routes)
        .route_layer(authenticated.clone())
        .with_state(request_state);

    // Vehicles (ownership checked in the service)
    let vehicle_routes = Router::new()
        .route(
            "/",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route(
            "/{id}",
            get(vehicles::get_vehicle)
                .put(vehicles::update_vehicle)
                .delete(vehicles::delete_vehicle),
        )
        .route_layer(authenticated.clone())
        .with_state(vehicles::VehicleHandlerState {
            vehicles: services.vehicles.clone(),
        });

    // Users: own account for everyone, the rest admin-only
    let user_admin_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/search/{query}", get(users::search_users))
        .route("/{id}", delete(users::delete_user))
        .route_layer(middleware::from_fn(require_admin));
    let user_routes = Router::new()
        .route(
            "/me",
            put(users::update_profile).delete(users::delete_own_account),
        )
        .merge(user_admin_routes)
        .route_layer(authenticated)
        .with_state(users::UserHandlerState {
            users: services.users.clone(),
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState::new(services.repos.clone()));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let mut router = Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health
        .merge(health_routes)
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/parking-slots", slot_routes)
        .nest("/api/v1/parking-requests", request_routes)
        .nest("/api/v1/vehicles", vehicle_routes)
        .nest("/api/v1/users", user_routes);

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    // Layers run bottom-up: trace, CORS, request id, then metrics
    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

use crate::color::Palette;
use crate::config::AppConfig;
use crate::map::MapCanvas;
use crate::render::render_scene;
use crate::scene::Scene;
use crate::state::ViewState;
use crate::svg;
use crate::types::Dataset;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
pub struct FeatureIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub dataset: Dataset,
    pub canvas: MapCanvas,
    pub palette: Palette,
    pub tree: RTree<FeatureIndex>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Result<Self> {
        let palette = Palette::from_config(&config.colors)?;
        let canvas = MapCanvas::project(&dataset.features, &config.map);

        let items: Vec<FeatureIndex> = dataset
            .features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                let rect = feature.geometry.bounding_rect()?;
                Some(FeatureIndex {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        Ok(Self {
            dataset,
            canvas,
            palette,
            tree: RTree::bulk_load(items),
            config,
        })
    }

    /// View state from request parameters; the attribute defaults to the first configured one.
    fn view(&self, params: &SceneParams) -> Result<ViewState, (StatusCode, String)> {
        let attribute = params
            .attribute
            .clone()
            .unwrap_or_else(|| self.config.default_attribute().to_string());
        if !self.config.attributes.names.contains(&attribute) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown attribute '{}'", attribute),
            ));
        }
        let mut view = ViewState::new(attribute);
        if let Some(key) = &params.highlight {
            view.hover(key);
        }
        Ok(view)
    }

    fn scene(&self, view: &ViewState) -> Scene {
        render_scene(
            &self.dataset,
            &self.canvas,
            view,
            &self.config,
            &self.palette,
        )
    }

    /// The record of the country whose outline contains the point.
    fn lookup(&self, lon: f64, lat: f64) -> Option<QueryResponse> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        let feature = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.dataset.features.get(candidate.index))
            .find(|feature| feature.geometry.contains(&point))?;

        let key = feature.key.clone()?;
        let attributes = self
            .dataset
            .records
            .iter()
            .find(|r| r.key == key)
            .map(|record| {
                record
                    .attributes
                    .iter()
                    .map(|(name, v)| (name.clone(), Some(*v).filter(|v| !v.is_nan())))
                    .collect()
            })
            .unwrap_or_default();
        Some(QueryResponse { key, attributes })
    }
}

#[derive(Deserialize, Default)]
pub struct SceneParams {
    attribute: Option<String>,
    highlight: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct QueryResponse {
    key: String,
    attributes: BTreeMap<String, Option<f64>>,
}

#[derive(Serialize)]
pub struct AttributesResponse {
    attributes: Vec<String>,
    default: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let output_service = ServeDir::new(&state.config.output.dir);
    Router::new()
        .route("/", get(index_handler))
        .route("/api/attributes", get(attributes_handler))
        .route("/api/scene", get(scene_handler))
        .route("/api/svg", get(svg_handler))
        .route("/api/query", get(query_handler))
        .nest_service("/output", output_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    info!("Building spatial index for API...");
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, dataset)?);
    info!("Spatial index built.");

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let view = ViewState::new(state.config.default_attribute());
    let scene = state.scene(&view);
    Html(page(&state.config, &scene))
}

async fn attributes_handler(State(state): State<Arc<AppState>>) -> Json<AttributesResponse> {
    Json(AttributesResponse {
        attributes: state.config.attributes.names.clone(),
        default: state.config.default_attribute().to_string(),
    })
}

async fn scene_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SceneParams>,
) -> Result<Json<Scene>, (StatusCode, String)> {
    let view = state.view(&params)?;
    Ok(Json(state.scene(&view)))
}

async fn svg_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SceneParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state.view(&params)?;
    let body = svg::document(&state.scene(&view));
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], body))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    Json(state.lookup(params.lon, params.lat))
}

const PAGE: &str = include_str!("page.html");

fn page(config: &AppConfig, scene: &Scene) -> String {
    let options: String = config
        .attributes
        .names
        .iter()
        .map(|name| {
            format!(
                r#"<option value="{value}">{label}</option>"#,
                value = svg::escape(name),
                label = svg::escape(&crate::scene::capitalize(name))
            )
        })
        .collect();

    PAGE.replace("__DURATION__", &config.transition.duration_ms.to_string())
        .replace("__STROKE__", &scene.highlight.color.to_string())
        .replace("__STROKE_WIDTH__", &scene.highlight.width.to_string())
        .replace("__OPTIONS__", &options)
        .replace("__SURFACE__", &svg::document(scene))
}

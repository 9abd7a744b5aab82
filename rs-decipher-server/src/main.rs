use std::env;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{get, post, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};

use rs_decipher_core::io::list_files;
use rs_decipher_core::model::store::{build_combined, corpus_path, load_or_build, CORPUS_EXTENSION};
use rs_decipher_core::model::{Alphabet, CandidateMapping, ModelConfig, ModelStore, Scorer, StatsTable};
use rs_decipher_core::ModelError;

/// Query parameters of `/v1/load_models` and `/v1/combine_models`
#[derive(Deserialize)]
struct ModelQuery {
	names: Option<String>,
	into: Option<String>,
	order: Option<usize>,
	remove_spaces: Option<bool>,
}

impl ModelQuery {
	/// Comma-separated model names, trimmed, empty entries dropped.
	fn names(&self) -> Result<Vec<&str>, String> {
		let names: Vec<&str> = match &self.names {
			Some(s) => s.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect(),
			None => Vec::new(),
		};
		if names.is_empty() {
			return Err("Missing or empty model name".to_owned());
		}
		Ok(names)
	}

	fn config(&self) -> ModelConfig {
		let mut config = ModelConfig::default();
		if let Some(order) = self.order {
			config.order = order;
		}
		if let Some(remove_spaces) = self.remove_spaces {
			config.remove_spaces = remove_spaces;
		}
		config
	}
}

/// Body of `/v1/score`
#[derive(Deserialize)]
struct ScoreRequest {
	model: String,
	mapping: CandidateMapping,
	cipher: Vec<Option<usize>>,
}

/// Body of `/v1/score_text`
#[derive(Deserialize)]
struct ScoreTextRequest {
	model: String,
	text: String,
}

#[derive(Serialize)]
struct ScoreResponse {
	score: f64,
}

struct SharedData {
	data_folder: PathBuf,
	store: ModelStore,
}

/// Maps a model error to a response: bad names and settings are the
/// client's fault, a missing corpus is not found, anything else is ours.
fn model_error_response(context: &str, e: &ModelError) -> HttpResponse {
	let mut response = match e {
		ModelError::InvalidName(_)
		| ModelError::InvalidOrder(_)
		| ModelError::InvalidScale(_)
		| ModelError::CapacityExceeded { .. } => HttpResponse::BadRequest(),
		ModelError::Io(io) if io.kind() == ErrorKind::NotFound => HttpResponse::NotFound(),
		_ => HttpResponse::InternalServerError(),
	};
	response.body(format!("{context}: {e}"))
}

/// Looks a model up, releasing the lock before the table is used.
fn find_model(data: &web::Data<Mutex<SharedData>>, name: &str) -> Result<Arc<StatsTable>, HttpResponse> {
	let shared_data = data
		.lock()
		.map_err(|_| HttpResponse::InternalServerError().body("Model lock failed"))?;
	shared_data
		.store
		.get(name)
		.ok_or_else(|| HttpResponse::NotFound().body(format!("Model {name} is not loaded")))
}

/// Resolves requested names to corpus files of the data folder, and copies
/// out what training needs so that it can run without the lock.
fn training_inputs(
	data: &web::Data<Mutex<SharedData>>,
	names: &[&str],
) -> Result<(Vec<(String, PathBuf)>, Alphabet), HttpResponse> {
	let shared_data = data
		.lock()
		.map_err(|_| HttpResponse::InternalServerError().body("Model lock failed"))?;
	let corpora = names
		.iter()
		.map(|&name| Ok((name.to_owned(), corpus_path(&shared_data.data_folder, name)?)))
		.collect::<Result<Vec<_>, ModelError>>()
		.map_err(|e| model_error_response("Rejected model name", &e))?;
	Ok((corpora, shared_data.store.alphabet().clone()))
}

/// HTTP GET endpoint `/v1/models`
///
/// Lists the corpora available in the data folder.
#[get("/v1/models")]
async fn get_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let folder = match data.lock() {
		Ok(m) => m.data_folder.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match list_files(&folder, CORPUS_EXTENSION) {
		Ok(files) => {
			let suffix = format!(".{CORPUS_EXTENSION}");
			let names: Vec<&str> = files.iter().filter_map(|file| file.strip_suffix(&suffix)).collect();
			HttpResponse::Ok().body(names.join("\n"))
		}
		Err(e) => {
			error!("Failed to list {}: {e}", folder.display());
			HttpResponse::InternalServerError().body("Failed to list models")
		}
	}
}

#[get("/v1/loaded_models")]
async fn get_loaded_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	HttpResponse::Ok().body(shared_data.store.model_names().join("\n"))
}

/// HTTP PUT endpoint `/v1/load_models`
///
/// Replaces the loaded models with the tables of the named corpora,
/// training (and caching) the ones that were never built for these settings.
///
/// # Notes
/// - Tables are built off the lock; the store is swapped only if all of
///   them load, otherwise the previous models stay in place.
#[put("/v1/load_models")]
async fn put_models(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let names = match query.names() {
		Ok(names) => names,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let config = query.config();
	let (corpora, alphabet) = match training_inputs(&data, &names) {
		Ok(inputs) => inputs,
		Err(response) => return response,
	};

	let loaded = web::block(move || {
		corpora
			.into_iter()
			.map(|(name, corpus)| {
				let table = load_or_build(&corpus, &alphabet, &config)
					.inspect_err(|e| error!("Failed to load {}: {e}", corpus.display()))?;
				Ok((name, Arc::new(table)))
			})
			.collect::<Result<Vec<_>, ModelError>>()
	})
	.await;
	let models = match loaded {
		Ok(Ok(models)) => models,
		Ok(Err(e)) => return model_error_response("Failed to load model", &e),
		Err(_) => return HttpResponse::InternalServerError().body("Training task failed"),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared_data.store.replace_all(models) {
		Ok(()) => HttpResponse::Ok().body("Models loaded successfully"),
		Err(e) => model_error_response("Failed to register models", &e),
	}
}

/// HTTP PUT endpoint `/v1/combine_models`
///
/// Trains a single model named `into` from several corpora.
#[put("/v1/combine_models")]
async fn put_combined(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let names = match query.names() {
		Ok(names) => names,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let into = match &query.into {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing target model name"),
	};
	let config = query.config();
	let (corpora, alphabet) = match training_inputs(&data, &names) {
		Ok(inputs) => inputs,
		Err(response) => return response,
	};
	let corpora: Vec<PathBuf> = corpora.into_iter().map(|(_, corpus)| corpus).collect();

	// Training runs without holding the lock
	let table = match web::block(move || build_combined(&corpora, &alphabet, &config)).await {
		Ok(Ok(table)) => table,
		Ok(Err(e)) => return model_error_response("Failed to build model", &e),
		Err(_) => return HttpResponse::InternalServerError().body("Training task failed"),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared_data.store.insert(&into, Arc::new(table)) {
		Ok(()) => HttpResponse::Ok().body(format!("Model {into} built")),
		Err(e) => model_error_response("Failed to register model", &e),
	}
}

/// HTTP POST endpoint `/v1/score`
///
/// Scores a cipher sequence deciphered through a candidate mapping.
#[post("/v1/score")]
async fn post_score(data: web::Data<Mutex<SharedData>>, body: web::Json<ScoreRequest>) -> impl Responder {
	let table = match find_model(&data, &body.model) {
		Ok(table) => table,
		Err(response) => return response,
	};
	if body.mapping.as_slice().iter().flatten().any(|&p| p >= table.dim()) {
		return HttpResponse::BadRequest().body(format!("Mapping targets must be < {}", table.dim()));
	}

	let score = Scorer::new(&table).score(&body.mapping, &body.cipher);
	HttpResponse::Ok().json(ScoreResponse { score })
}

/// HTTP POST endpoint `/v1/score_text`
///
/// Scores plain text as-is (identity mapping over the server alphabet).
#[post("/v1/score_text")]
async fn post_score_text(data: web::Data<Mutex<SharedData>>, body: web::Json<ScoreTextRequest>) -> impl Responder {
	let table = match find_model(&data, &body.model) {
		Ok(table) => table,
		Err(response) => return response,
	};
	let c_array = match data.lock() {
		Ok(m) => m.store.alphabet().encode(&body.text),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let score = Scorer::new(&table).score(&CandidateMapping::identity(table.dim()), &c_array);
	HttpResponse::Ok().json(ScoreResponse { score })
}

/// Cross-origin requests are refused unless an allowed origin is configured.
fn cors(origin: Option<&str>) -> Cors {
	match origin {
		Some(origin) => Cors::default()
			.allowed_origin(origin)
			.allowed_methods(vec!["GET", "PUT", "POST"])
			.allowed_header(header::CONTENT_TYPE)
			.max_age(3600),
		None => Cors::default(),
	}
}

/// Main entry point for the server.
///
/// # Notes
/// - `RS_DECIPHER_ADDR` sets the bind address (default `127.0.0.1:5000`).
/// - `RS_DECIPHER_DATA` sets the corpus folder (default `./data`).
/// - `RS_DECIPHER_CORS_ORIGIN` sets the one origin allowed cross-origin access.
/// - The server alphabet is `a..z` plus a space class.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let addr = env::var("RS_DECIPHER_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
	let data_folder = PathBuf::from(env::var("RS_DECIPHER_DATA").unwrap_or_else(|_| "./data".to_owned()));
	let cors_origin = env::var("RS_DECIPHER_CORS_ORIGIN").ok();
	info!("Serving models from {} on {addr}", data_folder.display());

	let shared_data = SharedData {
		data_folder,
		store: ModelStore::new(Alphabet::latin_with_space()),
	};
	let shared_model = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(cors(cors_origin.as_deref()))
			.app_data(shared_model.clone())
			.service(get_models)
			.service(get_loaded_models)
			.service(put_models)
			.service(put_combined)
			.service(post_score)
			.service(post_score_text)
	})
		.bind(addr)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::path::Path;

	use actix_web::{http::StatusCode, test};
	use rs_decipher_core::model::build;

	/// Shared state serving `folder`, with a pre-loaded model named "tiny".
	fn state_in(folder: &Path) -> web::Data<Mutex<SharedData>> {
		let alphabet = Alphabet::latin_with_space();
		let mut store = ModelStore::new(alphabet.clone());
		let table = build(&alphabet.tokenize("abab abab"), alphabet.dim(), 3, true).unwrap();
		store.insert("tiny", Arc::new(table)).unwrap();
		web::Data::new(Mutex::new(SharedData { data_folder: folder.to_path_buf(), store }))
	}

	fn state() -> web::Data<Mutex<SharedData>> {
		state_in(Path::new("./data"))
	}

	/// A temporary root holding a `data` folder with two corpora, and one
	/// corpus outside of it.
	fn corpus_tree() -> tempfile::TempDir {
		let root = tempfile::tempdir().unwrap();
		let data = root.path().join("data");
		fs::create_dir(&data).unwrap();
		fs::write(data.join("english.dat"), "the cat sat on the mat\nthe hat\n").unwrap();
		fs::write(data.join("french.dat"), "le chat est sur le tapis").unwrap();
		fs::write(data.join("notes.txt"), "not a corpus").unwrap();
		fs::write(root.path().join("outside.dat"), "secret").unwrap();
		root
	}

	fn loaded(data: &web::Data<Mutex<SharedData>>) -> Vec<String> {
		data.lock().unwrap().store.model_names()
	}

	#[actix_web::test]
	async fn scores_a_mapping() {
		let app = test::init_service(App::new().app_data(state()).service(post_score)).await;
		let identity: Vec<usize> = (0..27).collect();
		let req = test::TestRequest::post()
			.uri("/v1/score")
			.set_json(serde_json::json!({ "model": "tiny", "mapping": identity, "cipher": [0, 1, 0, 1] }))
			.to_request();
		let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
		assert!(body["score"].as_f64().unwrap() > 0.0);
	}

	#[actix_web::test]
	async fn unknown_model_is_not_found() {
		let app = test::init_service(App::new().app_data(state()).service(post_score_text)).await;
		let req = test::TestRequest::post()
			.uri("/v1/score_text")
			.set_json(serde_json::json!({ "model": "nope", "text": "abab" }))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}

	#[actix_web::test]
	async fn rejects_out_of_range_mapping() {
		let app = test::init_service(App::new().app_data(state()).service(post_score)).await;
		let req = test::TestRequest::post()
			.uri("/v1/score")
			.set_json(serde_json::json!({ "model": "tiny", "mapping": [27, null], "cipher": [0, 1] }))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn lists_loaded_models() {
		let app = test::init_service(App::new().app_data(state()).service(get_loaded_models)).await;
		let req = test::TestRequest::get().uri("/v1/loaded_models").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "tiny");
	}

	#[actix_web::test]
	async fn lists_corpora_of_the_data_folder() {
		let root = corpus_tree();
		let app = test::init_service(App::new().app_data(state_in(&root.path().join("data"))).service(get_models)).await;
		let req = test::TestRequest::get().uri("/v1/models").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "english\nfrench");
	}

	#[actix_web::test]
	async fn loads_models_and_caches_them_in_the_data_folder() {
		let root = corpus_tree();
		let folder = root.path().join("data");
		let data = state_in(&folder);
		let app = test::init_service(App::new().app_data(data.clone()).service(put_models)).await;

		let req = test::TestRequest::put().uri("/v1/load_models?names=english,%20french&order=2").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::OK);
		assert_eq!(loaded(&data), vec!["english", "french"]);
		assert!(folder.join("english.2-nospace.bin").exists());
		assert_eq!(data.lock().unwrap().store.get("english").unwrap().order(), 2);
	}

	#[actix_web::test]
	async fn unknown_corpus_keeps_previous_models() {
		let root = corpus_tree();
		let data = state_in(&root.path().join("data"));
		let app = test::init_service(App::new().app_data(data.clone()).service(put_models)).await;

		let req = test::TestRequest::put().uri("/v1/load_models?names=english,klingon").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
		assert_eq!(loaded(&data), vec!["tiny"]);
	}

	#[actix_web::test]
	async fn names_cannot_leave_the_data_folder() {
		let root = corpus_tree();
		let data = state_in(&root.path().join("data"));
		let app = test::init_service(App::new().app_data(data.clone()).service(put_models).service(put_combined)).await;

		for uri in [
			"/v1/load_models?names=../outside",
			"/v1/load_models?names=english,data/../../outside",
			"/v1/combine_models?names=english,../outside&into=mixed",
		] {
			let resp = test::call_service(&app, test::TestRequest::put().uri(uri).to_request()).await;
			assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
		}
		assert!(!root.path().join("outside.3-nospace.bin").exists());
		assert_eq!(loaded(&data), vec!["tiny"]);
	}

	#[actix_web::test]
	async fn combine_registers_the_target_name() {
		let root = corpus_tree();
		let data = state_in(&root.path().join("data"));
		let app = test::init_service(App::new().app_data(data.clone()).service(put_combined)).await;

		let req = test::TestRequest::put().uri("/v1/combine_models?names=english,french&into=mixed").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::OK);
		assert_eq!(loaded(&data), vec!["mixed", "tiny"]);

		let req = test::TestRequest::put().uri("/v1/combine_models?names=english").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn configured_origin_is_allowed() {
		let app = test::init_service(
			App::new().wrap(cors(Some("http://localhost:8080"))).app_data(state()).service(get_loaded_models),
		)
		.await;
		let req = test::TestRequest::get()
			.uri("/v1/loaded_models")
			.insert_header((header::ORIGIN, "http://localhost:8080"))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::OK);
		assert_eq!(
			resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
			"http://localhost:8080"
		);
	}
}

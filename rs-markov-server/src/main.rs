use std::env;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{get, post, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};

use rs_markov_core::codec;
use rs_markov_core::io::{get_filename, list_files, normalize_folder};
use rs_markov_core::model::{FrequencyModel, GenerationInput, Generator, StartSeed};
use rs_markov_core::persistence;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	length: Option<usize>,
	seed: Option<String> // -> none, corpus or custom:<text>
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>
}

#[derive(Serialize, Deserialize, Debug)]
struct Stats {
	name: String,
	order: usize,
	backoff: bool,
	alphabet: String,
	ngrams: usize,
	histogram: Vec<(u64, usize)>,
}

struct SharedData {
	name: String,
	model: Option<FrequencyModel>,
	data_dir: PathBuf,
}

impl GenerateParams {
	/// Determines the starting seed strategy for text generation.
	fn start_seed(&self) -> Result<StartSeed, String> {
		match &self.seed {
			None => Ok(StartSeed::Empty),
			Some(s) if s.to_lowercase() == "none" => Ok(StartSeed::Empty),
			Some(s) if s.to_lowercase() == "corpus" => Ok(StartSeed::Corpus),
			Some(s) if s.to_lowercase().starts_with("custom:") => {
				let value = &s["custom:".len()..];
				if value.is_empty() {
					Err("Custom seed cannot be empty".into())
				} else {
					Ok(StartSeed::Custom(value.to_owned()))
				}
			}
			Some(_) => Err("Seed must be 'none', 'corpus' or start with 'custom:'".into()),
		}
	}
}

/// Runs `f` against the loaded model, mapping lock and missing-model failures.
fn with_model<F>(data: &web::Data<RwLock<SharedData>>, f: F) -> HttpResponse
where
	F: FnOnce(&FrequencyModel) -> HttpResponse,
{
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match &shared_data.model {
		Some(model) => f(model),
		None => HttpResponse::ServiceUnavailable().body("No model loaded"),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates text from the loaded model based on query parameters.
/// Returns the generated text as the response body.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<RwLock<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let start_seed = match query.start_seed() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};
	let input = match GenerationInput::new(query.length.unwrap_or(200)) {
		Ok(input) => input.with_seed(start_seed),
		Err(e) => return HttpResponse::BadRequest().body(e)
	};

	with_model(&data, |model| match Generator::new(model).generate(&input) {
		Ok(result) => HttpResponse::Ok().body(result),
		Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
	})
}

/// HTTP POST endpoint `/v1/encode`: text body in, JSON rank array out.
#[post("/v1/encode")]
async fn post_encode(data: web::Data<RwLock<SharedData>>, body: String) -> impl Responder {
	with_model(&data, |model| match codec::encode(model, &body) {
		Ok(ranks) => HttpResponse::Ok().json(ranks),
		Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
	})
}

/// HTTP POST endpoint `/v1/decode`: JSON rank array in, text out.
#[post("/v1/decode")]
async fn post_decode(data: web::Data<RwLock<SharedData>>, ranks: web::Json<Vec<usize>>) -> impl Responder {
	with_model(&data, |model| match codec::decode(model, &ranks) {
		Ok(text) => HttpResponse::Ok().body(text),
		Err(e) => HttpResponse::UnprocessableEntity().body(e.to_string()),
	})
}

/// HTTP GET endpoint `/v1/stats`: name, configuration and count histogram
/// of the loaded model, read under one lock so they always match.
#[get("/v1/stats")]
async fn get_stats(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::ServiceUnavailable().body("No model loaded");
	};
	let table = match model.counts() {
		Ok(table) => table,
		Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
	};

	HttpResponse::Ok().json(Stats {
		name: shared_data.name.clone(),
		order: model.order(),
		backoff: model.backoff(),
		alphabet: model.alphabet().as_string(),
		ngrams: table.len(),
		histogram: table.histogram().into_iter().collect(),
	})
}

#[get("/v1/models")]
async fn get_models(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let data_dir = match data.read() {
		Ok(m) => m.data_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match list_files(&data_dir, "bin") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".bin", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models")
	}
}

#[put("/v1/load_model")]
async fn put_model(data: web::Data<RwLock<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};
	if name.contains(['/', '\\']) || name.contains("..") {
		return HttpResponse::BadRequest().body("Invalid model name");
	}

	let data_dir = match data.read() {
		Ok(m) => m.data_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	// Load outside the write lock so readers are not blocked meanwhile
	let model = match persistence::load_from_path(data_dir.join(format!("{name}.bin"))) {
		Ok(m) => m,
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}"))
	};

	let mut shared_data = match data.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	shared_data.name = name.to_owned();
	shared_data.model = Some(model);
	info!("model {name} loaded");

	HttpResponse::Ok().body("Model loaded successfully")
}

/// Loads the first cached model of the data directory, if any.
fn initial_model(data_dir: &Path) -> (String, Option<FrequencyModel>) {
	let first = match list_files(data_dir, "bin") {
		Ok(files) => files.into_iter().next(),
		Err(e) => {
			error!("cannot list {}: {e}", data_dir.display());
			None
		}
	};
	let Some(file) = first else {
		return (String::new(), None);
	};

	let path = data_dir.join(&file);
	match (get_filename(&path), persistence::load_from_path(&path)) {
		(Ok(name), Ok(model)) => (name, Some(model)),
		(_, Err(e)) => {
			error!("cannot load {}: {e}", path.display());
			(String::new(), None)
		}
		(Err(e), _) => {
			error!("invalid model path {}: {e}", path.display());
			(String::new(), None)
		}
	}
}

/// Main entry point for the server.
///
/// Loads the first model found in the data directory, wraps it in a
/// `RwLock` so queries run concurrently, and starts an Actix-web HTTP server.
///
/// # Configuration
/// - `RS_MARKOV_BIND`: listen address, `127.0.0.1:5000` by default
/// - `RS_MARKOV_DATA`: folder holding `.bin` models, `./data` by default
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let bind = env::var("RS_MARKOV_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
	let data_dir = normalize_folder(&env::var("RS_MARKOV_DATA").unwrap_or_else(|_| "./data".to_owned()));

	let (name, model) = initial_model(&data_dir);
	info!("serving on {bind} with data folder {} (model: {name:?})", data_dir.display());

	let shared_data = SharedData { name, model, data_dir };
	let shared_model = web::Data::new(RwLock::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.service(get_generated)
			.service(post_encode)
			.service(post_decode)
			.service(get_stats)
			.service(get_models)
			.service(put_model)
	})
		.bind(bind)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::{test, App};
	use rs_markov_core::model::ModelConfig;

	fn shared(model: Option<FrequencyModel>) -> web::Data<RwLock<SharedData>> {
		web::Data::new(RwLock::new(SharedData { name: "test".to_owned(), model, data_dir: PathBuf::from(".") }))
	}

	fn trained() -> FrequencyModel {
		FrequencyModel::trained(ModelConfig::new(1, "ab", true).unwrap(), "abababab").unwrap()
	}

	#[::core::prelude::v1::test]
	fn seeds_are_parsed() {
		let params = |seed: &str| GenerateParams { length: None, seed: Some(seed.to_owned()) };
		assert_eq!(params("none").start_seed().unwrap(), StartSeed::Empty);
		assert_eq!(params("Corpus").start_seed().unwrap(), StartSeed::Corpus);
		assert_eq!(params("custom:ab").start_seed().unwrap(), StartSeed::Custom("ab".to_owned()));
		assert!(params("custom:").start_seed().is_err());
		assert!(params("random:3").start_seed().is_err());
	}

	#[actix_web::test]
	async fn encode_then_decode_over_http() {
		let app = test::init_service(App::new().app_data(shared(Some(trained()))).service(post_encode).service(post_decode)).await;

		let request = test::TestRequest::post().uri("/v1/encode").set_payload("ab").to_request();
		let ranks: Vec<usize> = test::call_and_read_body_json(&app, request).await;
		assert_eq!(ranks, vec![0, 0]);

		let request = test::TestRequest::post().uri("/v1/decode").set_json(vec![0, 0]).to_request();
		let body = test::call_and_read_body(&app, request).await;
		assert_eq!(body, "ab");

		let request = test::TestRequest::post().uri("/v1/decode").set_json(vec![99]).to_request();
		let response = test::call_service(&app, request).await;
		assert_eq!(response.status(), 422);
	}

	#[actix_web::test]
	async fn stats_describe_the_loaded_model() {
		let app = test::init_service(App::new().app_data(shared(Some(trained()))).service(get_stats)).await;
		let request = test::TestRequest::get().uri("/v1/stats").to_request();
		let stats: Stats = test::call_and_read_body_json(&app, request).await;
		assert_eq!(stats.name, "test");
		assert_eq!(stats.order, 1);
		assert_eq!(stats.ngrams, 4);
		assert_eq!(stats.histogram, vec![(3, 1), (4, 3)]);
	}

	#[actix_web::test]
	async fn missing_model_is_unavailable() {
		let app = test::init_service(App::new().app_data(shared(None)).service(get_generated)).await;
		let request = test::TestRequest::get().uri("/v1/generate?length=5").to_request();
		let response = test::call_service(&app, request).await;
		assert_eq!(response.status(), 503);
	}
}

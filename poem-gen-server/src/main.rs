use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};

use log::info;
use serde::{Deserialize, Serialize};

use poem_gen_core::model::artifacts::Artifacts;
use poem_gen_core::model::generator::Generator;

/// Request bounds; anything outside is a 400.
const MAX_LINES: usize = 32;
const MAX_TOKENS_PER_LINE: usize = 64;

/// Struct representing query parameters for the `/v1/poem` endpoint
#[derive(Deserialize)]
struct PoemParams {
	seed: String,
	lines: Option<usize>,
	max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct AlternativesParams {
	/// Previous unit; absent means line-initial.
	prev: Option<String>,
}

#[derive(Deserialize)]
struct KeywordParams {
	token: String,
}

#[derive(Deserialize)]
struct WordParams {
	word: String,
}

#[derive(Deserialize)]
struct SearchParams {
	q: String,
}

#[derive(Serialize)]
struct SearchHit<'a> {
	id: u32,
	title: &'a str,
	cluster: u32,
}

fn within_limits(lines: usize, max_tokens: usize) -> bool {
	(1..=MAX_LINES).contains(&lines) && (1..=MAX_TOKENS_PER_LINE).contains(&max_tokens)
}

/// HTTP GET endpoint `/v1/poem`
///
/// Generates up to `lines` lines of at most `max_tokens` units from the
/// seed word. Each request owns its random draws; the artifact bundle is
/// only ever read.
#[get("/v1/poem")]
async fn get_poem(data: web::Data<Artifacts>, query: web::Query<PoemParams>) -> impl Responder {
	let lines = query.lines.unwrap_or(3);
	let max_tokens = query.max_tokens.unwrap_or(8);
	if !within_limits(lines, max_tokens) {
		return HttpResponse::BadRequest()
			.body(format!("lines must be 1..={MAX_LINES}, max_tokens 1..={MAX_TOKENS_PER_LINE}"));
	}

	let generator = Generator::new(data.get_ref());
	let poem = generator.generate(&query.seed, lines, max_tokens, &mut rand::rng());
	HttpResponse::Ok().json(poem)
}

/// HTTP GET endpoint `/v1/alternatives`
///
/// Lists the candidate units for the step following `prev`, with their
/// probabilities. Without `prev`, lists the line-initial starters.
#[get("/v1/alternatives")]
async fn get_alternatives(
	data: web::Data<Artifacts>,
	query: web::Query<AlternativesParams>,
) -> impl Responder {
	let generator = Generator::new(data.get_ref());
	let alternatives = generator.alternatives(query.prev.as_deref());
	HttpResponse::Ok().json(alternatives)
}

/// HTTP GET endpoint `/v1/keyword`
///
/// Resolves a generated unit's surface to the indexed word it carries,
/// or null.
#[get("/v1/keyword")]
async fn get_keyword(data: web::Data<Artifacts>, query: web::Query<KeywordParams>) -> impl Responder {
	let generator = Generator::new(data.get_ref());
	HttpResponse::Ok().json(generator.keyword_of(&query.token))
}

/// HTTP GET endpoint `/v1/documents`
///
/// Ids of the documents containing an indexed word.
#[get("/v1/documents")]
async fn get_documents_for(
	data: web::Data<Artifacts>,
	query: web::Query<WordParams>,
) -> impl Responder {
	let generator = Generator::new(data.get_ref());
	HttpResponse::Ok().json(generator.documents_for(&query.word))
}

/// HTTP GET endpoint `/v1/documents/{id}`
#[get("/v1/documents/{id}")]
async fn get_document(data: web::Data<Artifacts>, path: web::Path<u32>) -> impl Responder {
	let id = path.into_inner();
	match data.document(id) {
		Some(document) => HttpResponse::Ok().json(document),
		None => HttpResponse::NotFound().body(format!("no document {id}")),
	}
}

/// HTTP GET endpoint `/v1/search`
///
/// Case-insensitive title/body search over the corpus.
#[get("/v1/search")]
async fn get_search(data: web::Data<Artifacts>, query: web::Query<SearchParams>) -> impl Responder {
	let hits: Vec<SearchHit> = data
		.search(&query.q)
		.into_iter()
		.map(|d| SearchHit { id: d.id, title: &d.title, cluster: d.cluster })
		.collect();
	HttpResponse::Ok().json(hits)
}

/// Main entry point for the server.
///
/// Loads the artifact bundle wholesale, shares it read-only across
/// workers and starts the Actix-web HTTP server. Generation never
/// mutates the bundle, so no lock is involved.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - The bundle path comes from `POEM_GEN_DATA` (default
///   `./data/corpus.bin`).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let path = std::env::var("POEM_GEN_DATA").unwrap_or_else(|_| "./data/corpus.bin".to_owned());
	let artifacts = Artifacts::load(&path).map_err(std::io::Error::other)?;
	info!(
		"serving {} documents, {} chain units, {} starters from {path}",
		artifacts.documents.len(),
		artifacts.table.len(),
		artifacts.starters.len()
	);

	let shared = web::Data::new(artifacts);

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared.clone())
			.service(get_poem)
			.service(get_alternatives)
			.service(get_keyword)
			.service(get_documents_for)
			.service(get_document)
			.service(get_search)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}

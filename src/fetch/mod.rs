use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use std::time::Duration;

use crate::error::{Error, Result};
use crate::seq::{self, FastaRecord, Sequence};

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const SYNTHETIC_ACCESSION: &str = "SYNTHETIC_RANDOM_SEQ";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub min_len: usize,
    pub max_len: usize,
    /// Upper bound on IDs returned by the search step.
    pub retmax: usize,
}

impl Default for FetchRequest {
    fn default() -> Self {
        FetchRequest {
            min_len: 1000,
            max_len: 3000,
            retmax: 100,
        }
    }
}

impl FetchRequest {
    pub fn search_term(&self) -> String {
        format!(
            "{}:{}[SLEN] AND biomol_genomic[PROP] NOT mitochondrial[Title] NOT chloroplast[Title]",
            self.min_len, self.max_len
        )
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Error::EmptySequence);
        }
        if len < self.min_len || len > self.max_len {
            return Err(Error::OutOfRangeLength {
                len,
                min: self.min_len,
                max: self.max_len,
            });
        }
        Ok(())
    }
}

/// Anything that can hand back one FASTA record for a request.
pub trait SequenceSource {
    fn fetch<R: Rng + ?Sized>(&self, request: &FetchRequest, rng: &mut R) -> Result<FastaRecord>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    esearchresult: SearchResult,
}

#[derive(Deserialize, Default)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// NCBI E-utilities: `esearch` for candidate IDs, then `efetch` of one of
/// them as FASTA.
pub struct NcbiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NcbiClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(EUTILS_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(NcbiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn get(
        &self,
        endpoint: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<reqwest::blocking::Response> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        let url = format!("{}/{}", self.base_url, endpoint);
        let shown: Vec<_> = params.iter().filter(|(k, _)| *k != "api_key").collect();
        debug!("GET {} {:?}", url, shown);
        let response = self.client.get(url).query(&params).send()?.error_for_status()?;
        Ok(response)
    }

    pub fn search_ids(&self, request: &FetchRequest) -> Result<Vec<String>> {
        let params = vec![
            ("db", "nuccore".to_string()),
            ("term", request.search_term()),
            ("retmode", "json".to_string()),
            ("retmax", request.retmax.to_string()),
        ];
        let body = self.get("esearch.fcgi", params)?.text()?;
        parse_search_response(&body)
    }

    pub fn fetch_fasta(&self, id: &str) -> Result<String> {
        let params = vec![
            ("db", "nuccore".to_string()),
            ("id", id.to_string()),
            ("rettype", "fasta".to_string()),
            ("retmode", "text".to_string()),
        ];
        let bytes = self.get("efetch.fcgi", params)?.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// IDs from an esearch JSON body. Missing `esearchresult` or `idlist`
/// fields read as an empty list.
fn parse_search_response(body: &str) -> Result<Vec<String>> {
    let parsed: SearchResponse = serde_json::from_str(body)?;
    Ok(parsed.esearchresult.idlist)
}

fn pick_id<'a, R: Rng + ?Sized>(ids: &'a [String], rng: &mut R) -> Result<&'a str> {
    ids.choose(rng).map(String::as_str).ok_or(Error::NoIds)
}

impl SequenceSource for NcbiClient {
    fn fetch<R: Rng + ?Sized>(&self, request: &FetchRequest, rng: &mut R) -> Result<FastaRecord> {
        let ids = self.search_ids(request)?;
        let id = pick_id(&ids, rng)?;
        info!("fetching nuccore {} (1 of {} candidates)", id, ids.len());
        Ok(seq::parse_fasta(&self.fetch_fasta(id)?))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Remote,
    Synthetic { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedSequence {
    pub accession: String,
    pub sequence: Sequence,
    pub origin: Origin,
}

impl FetchedSequence {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, Origin::Synthetic { .. })
    }
}

fn accept(record: FastaRecord, request: &FetchRequest) -> Result<FetchedSequence> {
    request.check_length(record.sequence.len())?;
    Ok(FetchedSequence {
        accession: record.header,
        sequence: Sequence::new(record.sequence)?,
        origin: Origin::Remote,
    })
}

/// Random `ACGT` sequence with a length drawn from the request's range.
pub fn synthesize<R: Rng + ?Sized>(
    request: &FetchRequest,
    rng: &mut R,
    reason: String,
) -> FetchedSequence {
    let min_len = request.min_len.max(1);
    let max_len = request.max_len.max(min_len);
    let len = rng.gen_range(min_len..=max_len);
    let bases = seq::random_dna(len, rng);
    FetchedSequence {
        accession: SYNTHETIC_ACCESSION.to_string(),
        sequence: Sequence::from_checked(bases),
        origin: Origin::Synthetic { reason },
    }
}

/// Never fails: any problem with the source is logged and answered with a
/// synthetic sequence instead.
pub fn fetch_or_synthesize<S, R>(source: &S, request: &FetchRequest, rng: &mut R) -> FetchedSequence
where
    S: SequenceSource,
    R: Rng + ?Sized,
{
    match source.fetch(request, rng).and_then(|record| accept(record, request)) {
        Ok(fetched) => {
            info!("using {} ({} bp)", fetched.accession, fetched.sequence.len());
            fetched
        }
        Err(e) => {
            warn!("Error fetching from NCBI: {}", e);
            warn!("Falling back to synthetic random sequence...");
            synthesize(request, rng, e.to_string())
        }
    }
}

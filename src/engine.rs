//! Process-wide ingestion engine.
//!
//! Holds the shared HTTP client and configuration. The first call to
//! [`Engine::global`] (or an explicit [`Engine::init`]) builds it; every
//! later call reuses the same instance.
//!
//! Each operation runs its parsing pipeline on a blocking thread. The
//! pipeline pulls network chunks through a [`StreamAdapter`], one at a time
//! and in order, so nothing larger than a chunk plus the decoder's window is
//! buffered. Dropping an operation's future cancels the pipeline: the
//! blocking thread stops at its next pull and the connection is closed.

use reqwest::Client;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{EngineConfig, FetchOptions, Limits};
use crate::entry::{IndexResult, ParseResult};
use crate::error::{Error, Result};
use crate::extract::{self, check_total_size};
use crate::format::ArchiveFormat;
use crate::index;
use crate::io::{
    ByteSource, ChunkSink, LocalFileReader, NetworkByteSource, ReadAt, SliceReader, StreamAdapter,
};
use crate::store::RandomAccessStore;
use crate::zip::ZipExtractor;

static ENGINE: OnceLock<Engine> = OnceLock::new();

pub struct Engine {
    client: Client,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Initialize the global engine with `config`.
    ///
    /// If it already exists the existing instance is returned unchanged.
    pub fn init(config: EngineConfig) -> Result<&'static Engine> {
        if let Some(engine) = ENGINE.get() {
            warn!("engine already initialized; ignoring new configuration");
            return Ok(engine);
        }
        let engine = Engine::new(config)?;
        Ok(ENGINE.get_or_init(|| engine))
    }

    /// The global engine, built with the default configuration on first use.
    pub fn global() -> Result<&'static Engine> {
        match ENGINE.get() {
            Some(engine) => Ok(engine),
            None => Engine::init(EngineConfig::default()),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.config.limits
    }

    /// Parse an in-memory archive, detecting tgz or zip from its magic bytes.
    pub fn parse_bytes(&self, data: &[u8]) -> Result<ParseResult> {
        let limits = &self.config.limits;
        check_total_size(data.len() as u64, limits)?;

        match ArchiveFormat::detect(data) {
            ArchiveFormat::Tgz => extract::extract_tgz(data, limits),
            ArchiveFormat::Zip => ZipExtractor::new(&SliceReader::new(data), *limits).parse(),
            ArchiveFormat::Unknown => Err(Error::format("unrecognized archive format")),
        }
    }

    /// Parse a local archive.
    ///
    /// The file size is checked against the total cap before anything is
    /// read. A `.tgz` is streamed through the decoder and a `.zip` is read
    /// in place, so neither is loaded whole.
    pub fn parse_file(&self, path: &Path) -> Result<ParseResult> {
        let limits = &self.config.limits;
        let reader = LocalFileReader::new(path)?;
        check_total_size(reader.size(), limits)?;

        let mut magic = [0u8; 4];
        let n = reader.read_at(0, &mut magic)?;
        match ArchiveFormat::detect(&magic[..n]) {
            ArchiveFormat::Tgz => {
                let file = File::open(path).map_err(Error::Io)?;
                extract::extract_tgz(file, limits)
            }
            ArchiveFormat::Zip => ZipExtractor::new(&reader, *limits).parse(),
            ArchiveFormat::Unknown => Err(Error::format(format!(
                "unrecognized archive format: {}",
                path.display()
            ))),
        }
    }

    /// Stream a remote `.tgz` and extract it eagerly.
    ///
    /// Rejected with [`Error::SizeExceeded`] as soon as the declared length
    /// or the transferred byte count passes the total-size cap.
    pub async fn fetch_and_parse(&self, url: &str, options: &FetchOptions) -> Result<ParseResult> {
        let limits = self.config.limits;
        let source = NetworkByteSource::open(&self.client, url, options).await?;
        if let Some(len) = source.declared_len() {
            check_total_size(len, &limits)?;
        }

        let cancel = CancellationToken::new();
        let _abandon = cancel.clone().drop_guard();
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || {
            let adapter = StreamAdapter::new(source, handle)
                .with_limit(limits.max_total_size)
                .with_cancellation(cancel);
            extract::extract_tgz(adapter, &limits)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Stream a remote `.tgz`, forwarding the decompressed tar bytes to
    /// `sink` and returning the offset index.
    ///
    /// The total-size cap does not apply: the point of indexing is to
    /// handle archives too large to extract eagerly. On error the sink has
    /// received a prefix of the stream and must be discarded.
    pub async fn index_url<K>(&self, url: &str, options: &FetchOptions, sink: K) -> Result<IndexResult>
    where
        K: ChunkSink + 'static,
    {
        let limits = self.config.limits;
        let source = NetworkByteSource::open(&self.client, url, options).await?;

        let cancel = CancellationToken::new();
        let _abandon = cancel.clone().drop_guard();
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || {
            let adapter = StreamAdapter::new(source, handle).with_cancellation(cancel);
            index::index_tgz(adapter, sink, &limits)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }

    /// Index a remote `.tgz` into a fresh store and finalize it.
    ///
    /// On failure the partially filled store is disposed before the error
    /// is returned.
    pub async fn index_into_store(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<(Arc<RandomAccessStore>, IndexResult)> {
        let store = RandomAccessStore::shared();

        let result = match self.index_url(url, options, store.clone()).await {
            Ok(index) => store.finalize(&index.files).map(|()| index),
            Err(e) => Err(e),
        };

        match result {
            Ok(index) => Ok((store, index)),
            Err(e) => {
                debug!(url, error = %e, "indexing failed; disposing store");
                store.dispose();
                Err(e)
            }
        }
    }
}

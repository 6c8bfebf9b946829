//! MCWS (media-server web service) adapter.
//!
//! Every call is a GET against `http://host:port/MCWS/v1/<path>` carrying the
//! zone parameters and, when configured, the access key. Responses are XML:
//!
//! ```text
//! Library/Values   <Response><Item>value</Item>…</Response>
//! Playback/Info    <Response><Item Name="FileKey">42</Item>…</Response>
//! Files/Search     <MPL><Item><Field Name="Key">42</Field>…</Item>…</MPL>
//! ```
//!
//! Transient failures (transport errors, 5xx) are retried by the configured
//! `RetryPolicy` before surfacing as `EncoreError`.

use std::collections::HashMap;
use std::time::Duration;

use encore_core::{
    CatalogSource, EncoreError, FieldKind, LibraryEntity, LibrarySearch, NowPlaying,
    PlaybackControl, Result, RetryPolicy, SearchQuery, VolumeStep,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

/// Values requested per catalog fetch.
const VALUES_LIMIT: &str = "10000";
const VOLUME_DELTA: &str = "0.1";

#[derive(Debug, Clone)]
pub struct McwsConfig {
    /// Ends with `/MCWS/v1/`.
    pub base_url: String,
    pub access_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub struct McwsClient {
    http: reqwest::blocking::Client,
    config: McwsConfig,
}

impl McwsClient {
    pub fn new(config: McwsConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EncoreError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self { http, config })
    }

    /// Single unretried probe of the `Alive` endpoint.
    pub fn alive(&self) -> bool {
        match self.get_once("Alive", &[]) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "media server liveness probe failed");
                false
            }
        }
    }

    fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        self.config.retry.run(path, || self.get_once(path, params))
    }

    fn command(&self, path: &str, params: &[(&str, &str)]) -> Result<()> {
        self.request(path, params)?;
        debug!(path, "media server command sent");
        Ok(())
    }

    fn get_once(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .query(&[("Zone", "-1"), ("ZoneType", "ID")]);
        if let Some(key) = &self.config.access_key {
            request = request.query(&[("Key", key.as_str())]);
        }
        let response = request
            .query(params)
            .send()
            .map_err(|e| EncoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EncoreError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        response
            .text()
            .map_err(|e| EncoreError::Transport(e.to_string()))
    }

    fn info(&self) -> Result<HashMap<String, String>> {
        let xml = self.request("Playback/Info", &[])?;
        Ok(parse_items(&xml)?
            .into_iter()
            .filter_map(|item| item.name.map(|name| (name, item.text)))
            .collect())
    }
}

impl std::fmt::Debug for McwsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McwsClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl CatalogSource for McwsClient {
    fn fetch_values(&self, field: FieldKind) -> Result<Vec<String>> {
        let xml = self.request(
            "Library/Values",
            &[("Field", field.as_str()), ("Limit", VALUES_LIMIT)],
        )?;
        Ok(parse_items(&xml)?
            .into_iter()
            .map(|item| item.text)
            .filter(|text| !text.is_empty())
            .collect())
    }
}

impl LibrarySearch for McwsClient {
    fn search(&self, query: &SearchQuery) -> Result<Vec<LibraryEntity>> {
        let expr = match query {
            SearchQuery::Text(text) => text.clone(),
            SearchQuery::Album(album) => format!("[Album]=[{album}]"),
        };
        let xml = self.request("Files/Search", &[("Query", expr.as_str())])?;
        parse_entities(&xml)
    }
}

impl PlaybackControl for McwsClient {
    fn play(&self) -> Result<()> {
        self.command("Playback/Play", &[])
    }

    fn pause(&self) -> Result<()> {
        self.command("Playback/Pause", &[])
    }

    fn stop(&self) -> Result<()> {
        self.command("Playback/Stop", &[])
    }

    fn stop_all(&self) -> Result<()> {
        self.command("Playback/StopAll", &[])
    }

    fn next(&self) -> Result<()> {
        self.command("Playback/Next", &[])
    }

    fn previous(&self) -> Result<()> {
        self.command("Playback/Previous", &[])
    }

    fn adjust_volume(&self, step: VolumeStep) -> Result<()> {
        let level = match step {
            VolumeStep::Up => VOLUME_DELTA.to_string(),
            VolumeStep::Down => format!("-{VOLUME_DELTA}"),
        };
        self.command(
            "Playback/Volume",
            &[("Level", level.as_str()), ("DeltaMode", "1")],
        )
    }

    fn set_playlist_position(&self, position: usize) -> Result<()> {
        let position = position.to_string();
        self.command(
            "Playback/SetPlaylistPosition",
            &[("Position", position.as_str())],
        )
    }

    fn play_by_keys(&self, keys: &[String]) -> Result<()> {
        let keys = keys.join(",");
        self.command("Playback/PlayByKey", &[("Key", keys.as_str())])
    }

    fn play_open_search(&self, seed: &str) -> Result<()> {
        self.command("Playback/PlayDoctor", &[("Seed", seed), ("Radio", "0")])
    }

    fn now_playing(&self) -> Result<NowPlaying> {
        let info = self.info()?;
        let count = |name: &str| {
            info.get(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0)
        };
        let text = |name: &str| info.get(name).filter(|v| !v.is_empty()).cloned();
        Ok(NowPlaying {
            name: text("Name"),
            artist: text("Artist"),
            album: text("Album"),
            file_key: text("FileKey").filter(|k| k != "-1"),
            position: count("PlayingNowPosition"),
            total_tracks: count("PlayingNowTracks"),
        })
    }

    fn playlist(&self) -> Result<Vec<LibraryEntity>> {
        let xml = self.request("Playback/Playlist", &[])?;
        parse_entities(&xml)
    }

    fn file_info(&self, key: &str) -> Result<Option<LibraryEntity>> {
        let xml = self.request("File/GetInfo", &[("File", key)])?;
        Ok(parse_entities(&xml)?.into_iter().next())
    }
}

// ── XML parsing ──────────────────────────────────────────────────────────────

/// One `<Item>` element: its `Name` attribute, direct text and `<Field>`s.
#[derive(Debug, Default, PartialEq)]
struct XmlItem {
    name: Option<String>,
    text: String,
    fields: Vec<(String, String)>,
}

fn parse_entities(xml: &str) -> Result<Vec<LibraryEntity>> {
    Ok(parse_items(xml)?
        .into_iter()
        .map(|item| {
            item.fields
                .into_iter()
                .fold(LibraryEntity::new(), |entity, (name, value)| {
                    entity.with(&name, value)
                })
        })
        .collect())
}

fn parse_items(xml: &str) -> Result<Vec<XmlItem>> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut item: Option<XmlItem> = None;
    let mut field: Option<(String, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            EncoreError::Parse(format!("{e} at byte {}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => match start.name().as_ref() {
                b"Item" => item = Some(start_item(&start)?),
                b"Field" if item.is_some() => {
                    field = Some((name_attr(&start)?.unwrap_or_default(), String::new()));
                }
                _ => {}
            },
            Event::Empty(empty) => match empty.name().as_ref() {
                b"Item" => items.push(start_item(&empty)?),
                b"Field" => {
                    if let (Some(item), Some(name)) = (item.as_mut(), name_attr(&empty)?) {
                        item.fields.push((name, String::new()));
                    }
                }
                _ => {}
            },
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| EncoreError::Parse(e.to_string()))?;
                if let Some((_, value)) = field.as_mut() {
                    value.push_str(&text);
                } else if let Some(item) = item.as_mut() {
                    item.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                if let Some((_, value)) = field.as_mut() {
                    value.push_str(&text);
                } else if let Some(item) = item.as_mut() {
                    item.text.push_str(&text);
                }
            }
            Event::End(end) => match end.name().as_ref() {
                b"Field" => {
                    if let (Some(item), Some((name, value))) = (item.as_mut(), field.take()) {
                        if !name.is_empty() {
                            item.fields.push((name, value.trim().to_string()));
                        }
                    }
                }
                b"Item" => {
                    if let Some(mut done) = item.take() {
                        done.text = done.text.trim().to_string();
                        items.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if item.is_some() {
        warn!("media server response ended inside an <Item>");
    }
    Ok(items)
}

fn start_item(start: &BytesStart<'_>) -> Result<XmlItem> {
    Ok(XmlItem {
        name: name_attr(start)?,
        ..XmlItem::default()
    })
}

fn name_attr(start: &BytesStart<'_>) -> Result<Option<String>> {
    let attr = start
        .try_get_attribute("Name")
        .map_err(|e| EncoreError::Parse(e.to_string()))?;
    attr.map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .map_err(|e| EncoreError::Parse(e.to_string()))
    })
    .transpose()
}

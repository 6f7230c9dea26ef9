#![allow(dead_code)]

use polars::prelude::*;
use std::io::Cursor;
use std::sync::mpsc::{channel, Receiver};
use tabq::config::AppConfig;
use tabq::{HostMessage, PolarsEngine, Session, SessionEvent, Status};

pub const PEOPLE_CSV: &str = "name,age,city\nalice,34,Oslo\nbob,27,Lima\ncarol,,Oslo\n";

pub fn new_session() -> (Session, Receiver<HostMessage>) {
    new_session_with(AppConfig::default())
}

pub fn new_session_with(config: AppConfig) -> (Session, Receiver<HostMessage>) {
    let (tx, rx) = channel();
    (
        Session::new(Box::new(PolarsEngine::new()), config, tx),
        rx,
    )
}

pub fn load(session: &mut Session, file_name: &str, bytes: impl Into<Vec<u8>>) -> Status {
    session.event(SessionEvent::Load {
        file_name: file_name.to_string(),
        bytes: bytes.into(),
    })
}

pub fn sample_frame() -> DataFrame {
    df!(
        "id" => [1i64, 2, 3],
        "label" => ["one", "two", "three"],
        "score" => [Some(1.5f64), None, Some(3.0)]
    )
    .unwrap()
}

pub fn parquet_bytes(df: &mut DataFrame) -> Vec<u8> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf).finish(df).unwrap();
    buf
}

pub fn arrow_bytes(df: &mut DataFrame) -> Vec<u8> {
    let mut buf = Vec::new();
    IpcWriter::new(&mut buf).finish(df).unwrap();
    buf
}

pub fn read_arrow(bytes: Vec<u8>) -> DataFrame {
    IpcReader::new(Cursor::new(bytes)).finish().unwrap()
}

pub fn read_parquet(bytes: Vec<u8>) -> DataFrame {
    ParquetReader::new(Cursor::new(bytes)).finish().unwrap()
}

/// Display text of every visible row.
pub fn visible(session: &Session) -> Vec<Vec<String>> {
    session
        .grid()
        .visible_rows()
        .map(|row| row.display.clone())
        .collect()
}

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::models::{RssChannel, RssDocument, RssItem};
use crate::{Error, Result};

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`PUB_DATE_FORMAT`] after the weekday
const DATE_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            _ => None,
        }
    }
}

enum Target {
    Channel(Field),
    Item(Field),
}

/// Locate the field a text node belongs to, given the open element path.
/// Only `<root><channel><field>` and `<root><channel><item><field>` count.
fn target_for(path: &[Vec<u8>]) -> Option<Target> {
    match path {
        [_, channel, field] if channel.as_slice() == b"channel" => {
            Field::from_name(field).map(Target::Channel)
        }
        [_, channel, item, field] if channel.as_slice() == b"channel" && item.as_slice() == b"item" => {
            Field::from_name(field).map(Target::Item)
        }
        _ => None,
    }
}

fn is_channel_level(path: &[Vec<u8>]) -> bool {
    matches!(path, [_, channel] if channel.as_slice() == b"channel")
}

/// Decode an RSS 2.0 document and unescape HTML entities in its text fields
pub fn parse_rss(content: &[u8]) -> Result<RssDocument> {
    let text = std::str::from_utf8(content)
        .map_err(|e| Error::FeedParse(format!("Feed is not valid UTF-8: {}", e)))?;
    let text = text.trim_start_matches('\u{feff}');

    // Fields are trimmed once in `finish_document`; per-event trimming would
    // eat the spaces around CDATA sections
    let mut reader = Reader::from_str(text);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut channel_seen = false;
    let mut channel = RssChannel::default();
    let mut current_item: Option<RssItem> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if path.len() == 1 && name == b"channel" {
                    channel_seen = true;
                }
                if is_channel_level(&path) && name == b"item" {
                    current_item = Some(RssItem::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if path.len() == 1 && e.name().as_ref() == b"channel" {
                    channel_seen = true;
                }
            }
            Ok(Event::End(e)) => {
                path.pop();
                if e.name().as_ref() == b"item" && is_channel_level(&path) {
                    if let Some(item) = current_item.take() {
                        channel.items.push(item);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let value = match e.unescape() {
                    Ok(v) => v.into_owned(),
                    // Unknown entities such as &nbsp; are left for the HTML pass
                    Err(_) => String::from_utf8_lossy(e.as_ref()).into_owned(),
                };
                append_text(&path, &mut channel, current_item.as_mut(), &value);
            }
            Ok(Event::CData(e)) => {
                let value = String::from_utf8_lossy(e.as_ref()).into_owned();
                append_text(&path, &mut channel, current_item.as_mut(), &value);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::FeedParse(format!(
                    "Malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !channel_seen {
        return Err(Error::FeedParse(
            "Document has no <channel> element".to_string(),
        ));
    }

    let mut document = RssDocument { channel };
    finish_document(&mut document);
    Ok(document)
}

fn append_text(
    path: &[Vec<u8>],
    channel: &mut RssChannel,
    item: Option<&mut RssItem>,
    value: &str,
) {
    match target_for(path) {
        Some(Target::Channel(field)) => {
            let slot = match field {
                Field::Title => &mut channel.title,
                Field::Link => &mut channel.link,
                Field::Description => &mut channel.description,
                Field::PubDate => return,
            };
            slot.push_str(value);
        }
        Some(Target::Item(field)) => {
            if let Some(item) = item {
                let slot = match field {
                    Field::Title => &mut item.title,
                    Field::Link => &mut item.link,
                    Field::Description => &mut item.description,
                    Field::PubDate => &mut item.pub_date,
                };
                slot.push_str(value);
            }
        }
        None => {}
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn unescape_html(value: &mut String) {
    trim_in_place(value);
    *value = html_escape::decode_html_entities(value.as_str()).into_owned();
}

/// Trim every field, then give titles and descriptions a second,
/// HTML-level decoding pass since feeds commonly double-encode markup.
fn finish_document(document: &mut RssDocument) {
    let channel = &mut document.channel;
    trim_in_place(&mut channel.link);
    unescape_html(&mut channel.title);
    unescape_html(&mut channel.description);
    for item in &mut channel.items {
        trim_in_place(&mut item.link);
        trim_in_place(&mut item.pub_date);
        unescape_html(&mut item.title);
        unescape_html(&mut item.description);
    }
}

/// Parse an item's `pubDate` into an absolute instant.
///
/// The weekday must be a valid abbreviation but is not checked against the
/// date, since feeds often get it wrong.
pub fn parse_pub_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    let parsed = match value.split_once(", ") {
        Some((weekday, rest)) if WEEKDAYS.iter().any(|d| d.eq_ignore_ascii_case(weekday)) => {
            DateTime::parse_from_str(rest, DATE_TIME_FORMAT)
        }
        _ => DateTime::parse_from_str(value, PUB_DATE_FORMAT),
    };

    parsed
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| Error::DateParse {
            value: value.to_string(),
            source,
        })
}

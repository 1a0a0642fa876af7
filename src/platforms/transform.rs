// src/platforms/transform.rs - Wire message to internal Message mapping

use chrono::{DateTime, Utc};

use crate::platforms::telegram::{TgEntity, TgMessage, TgUser};
use crate::types::{Entity, Image, Message, SenderChat, User};

/// Build the internal `Message` from the wire representation.
pub fn transform(msg: &TgMessage) -> Message {
    let mut message = Message {
        id: msg.message_id,
        sent: sent_time(msg.date),
        text: msg.text.clone(),
        ..Default::default()
    };

    if let Some(chat) = &msg.chat {
        message.chat_id = chat.id;
    }

    if let Some(from) = &msg.from {
        message.from = transform_user(from);
    }

    if let Some(sender_chat) = &msg.sender_chat {
        message.sender_chat = Some(SenderChat {
            id: sender_chat.id,
            username: sender_chat.username.clone(),
        });
    }

    if !msg.entities.is_empty() {
        message.entities = transform_entities(&msg.entities);
    } else if let Some(largest) = msg.photo.last() {
        message.image = Some(Image {
            file_id: largest.file_id.clone(),
            width: largest.width,
            height: largest.height,
            caption: msg.caption.clone(),
            entities: transform_entities(&msg.caption_entities),
        });
    }

    if let Some(reply) = &msg.reply_to_message {
        let mut reply_to = Message {
            text: reply.text.clone(),
            sent: sent_time(reply.date),
            ..Default::default()
        };
        if let Some(from) = &reply.from {
            reply_to.from = transform_user(from);
        }
        if let Some(sender_chat) = &reply.sender_chat {
            reply_to.sender_chat = Some(SenderChat {
                id: sender_chat.id,
                username: sender_chat.username.clone(),
            });
        }
        message.reply_to = Some(Box::new(reply_to));
    }

    message
}

fn sent_time(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap_or_default()
}

fn transform_user(user: &TgUser) -> User {
    let display_name = [user.first_name.trim(), user.last_name.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    User {
        id: user.id,
        username: user.username.clone(),
        display_name,
    }
}

fn transform_entities(entities: &[TgEntity]) -> Option<Vec<Entity>> {
    if entities.is_empty() {
        return None;
    }

    let result = entities
        .iter()
        .map(|entity| Entity {
            kind: entity.kind.clone(),
            offset: entity.offset,
            length: entity.length,
            url: entity.url.clone(),
            user: entity.user.as_ref().map(transform_user),
        })
        .collect();

    Some(result)
}

pub mod chat_service;

#[cfg(test)]
mod chat_service_tests;

pub use chat_service::{
    AddParticipantRequest, ChatService, ChatServiceDependencies, CreateRoomRequest,
    DeleteMessageRequest, EditMessageRequest, MessagePayload, ReactRequest,
    RemoveParticipantRequest, SendMessageRequest,
};

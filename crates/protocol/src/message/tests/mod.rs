use super::{AskOptions, FieldCursor, Message, MessageCode, WaitOptions};
use crate::wire::MAX_PAYLOAD;

mod codes;
mod constructors;

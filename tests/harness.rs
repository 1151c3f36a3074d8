#![allow(non_snake_case)]

mod lobby_actions;

pub mod evidence;
pub mod hashtag;
pub mod keywords;
pub mod tags;
pub mod text;

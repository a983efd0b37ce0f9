// GameID validation: 5-30 chars, alphanumerics plus '-', '.', '/'.

const MIN_LEN: usize = 5;
const MAX_LEN: usize = 30;

pub fn is_valid_game_id(id: &str) -> bool {
    let len = id.chars().count();
    if len < MIN_LEN || len > MAX_LEN {
        return false;
    }
    id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '/')
}

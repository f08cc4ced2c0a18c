use std::path::Path;

use crate::commands::common::{board_to_list_item, format_board_lines, list_boards, BoardListItem};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let boards = list_boards(limit, db_path).await?;

    if as_json {
        let json_items = boards
            .iter()
            .map(board_to_list_item)
            .collect::<Vec<BoardListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if boards.is_empty() {
        println!("No boards yet. Create one with `corkboard add <title>`.");
    } else {
        for line in format_board_lines(&boards) {
            println!("{line}");
        }
    }

    Ok(())
}

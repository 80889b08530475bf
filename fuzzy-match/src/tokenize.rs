/// Splits text into match tokens.
///
/// ASCII alphanumeric runs become lowercase words. Runs of other letters
/// (kana, kanji, hangul, ...) carry no spaces between words, so they are
/// broken into overlapping character bigrams instead; a single letter run
/// stays a one-character token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut run: Vec<char> = Vec::new();

    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            flush_run(&mut run, &mut tokens);
            word.push(c);
        } else if c.is_alphanumeric() {
            flush_word(&mut word, &mut tokens);
            run.push(c);
        } else {
            flush_word(&mut word, &mut tokens);
            flush_run(&mut run, &mut tokens);
        }
    }
    flush_word(&mut word, &mut tokens);
    flush_run(&mut run, &mut tokens);

    tokens
}

fn flush_word(word: &mut String, tokens: &mut Vec<String>) {
    if !word.is_empty() {
        tokens.push(std::mem::take(word));
    }
}

fn flush_run(run: &mut Vec<char>, tokens: &mut Vec<String>) {
    match run.len() {
        0 => return,
        1 => tokens.push(run[0].to_string()),
        _ => tokens.extend(run.windows(2).map(|pair| pair.iter().collect::<String>())),
    }
    run.clear();
}

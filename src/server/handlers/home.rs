use axum::response::Html;

/// Single free-text input and a submit action; the pipeline is picked from
/// a dropdown and the response is rendered as plain text.
pub async fn home() -> Html<&'static str> {
    Html(PAGE)
}

const PAGE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Verba</title>
<style>
  body { font-family: sans-serif; max-width: 640px; margin: 2rem auto; }
  input[type=text] { width: 70%; padding: 0.4rem; }
  select, button { padding: 0.4rem; }
  pre { background: #f4f4f4; padding: 1rem; white-space: pre-wrap; }
</style>
</head>
<body>
<h2>Ask a question</h2>
<form id="ask">
  <input type="text" id="question" placeholder="Input:" autofocus>
  <select id="mode">
    <option value="/api/nl2sql">SQL</option>
    <option value="/api/rag/query">Knowledge base</option>
    <option value="/api/research">Research agent</option>
  </select>
  <button type="submit">Get Answer</button>
</form>
<h3>The response is</h3>
<pre id="result"></pre>
<script>
document.getElementById('ask').addEventListener('submit', async (event) => {
  event.preventDefault();
  const result = document.getElementById('result');
  result.textContent = '...';
  const response = await fetch(document.getElementById('mode').value, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ question: document.getElementById('question').value }),
  });
  const payload = await response.json();
  result.textContent = JSON.stringify(payload, null, 2);
});
</script>
</body>
</html>
"#;

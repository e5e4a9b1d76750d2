use anyhow::Result;
use repertoire_audit::BucketReport;
use serde::Serialize;

/// Header metadata shown at the top of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub generated_at: String,
    pub root: String,
    pub side: String,
    pub engine: String,
    pub move_eval: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    meta: &'a ReportMeta,
    openings: &'a [BucketReport],
}

/// Render the self-contained HTML report: one embedded JSON payload plus a
/// small client-side list renderer.
pub fn render_html(meta: &ReportMeta, openings: &[BucketReport]) -> Result<String> {
    let payload = Payload { meta, openings };
    // Guard the embedded JSON against a literal </script> terminator.
    let data_json = serde_json::to_string(&payload)?.replace("</", "<\\/");

    let doc = HTML_TEMPLATE
        .replace("__GENERATED_AT__", &escape_html(&meta.generated_at))
        .replace("__SIDE__", &escape_html(&meta.side))
        .replace("__ENGINE__", &escape_html(&meta.engine))
        .replace("__MOVE_EVAL__", &escape_html(&meta.move_eval))
        .replace("__ROOT__", &escape_html(&meta.root))
        .replace("__COUNT__", &openings.len().to_string())
        .replace("__DATA_JSON__", &data_json);
    Ok(doc)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const HTML_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Repertoire collisions report</title>
<style>
:root{
  --bg:#0b0f14; --text:#e8eef7; --muted:#9aabc0; --border:rgba(255,255,255,.12);
  --accent:#5aa7ff; --green:#3fd99a; --amber:#ffcc66; --red:#ff7070;
  --mono:ui-monospace,SFMono-Regular,Menlo,Consolas,monospace;
}
html,body{margin:0;background:var(--bg);color:var(--text);
  font-family:ui-sans-serif,system-ui,-apple-system,"Segoe UI",Roboto,Helvetica,Arial;}
.wrap{max-width:1100px;margin:24px auto;padding:0 16px 60px;}
h1{font-size:20px;margin:0 0 4px;}
.sub{color:var(--muted);font-size:12.5px;margin:0 0 12px;}
.pill{display:inline-block;padding:5px 10px;border:1px solid var(--border);
  border-radius:999px;color:var(--muted);font-size:12.5px;margin-right:8px;}
.pill b{color:var(--text);}
.controls{display:flex;gap:10px;margin:14px 0;}
input,select{padding:9px 11px;border-radius:10px;border:1px solid var(--border);
  background:rgba(255,255,255,.04);color:var(--text);outline:none;}
input{flex:1;}
.card{border:1px solid var(--border);border-radius:14px;padding:12px;
  margin-bottom:12px;background:rgba(255,255,255,.025);}
.badge{display:inline-block;padding:3px 9px;border:1px solid var(--border);
  border-radius:999px;font-size:12px;margin-right:6px;color:var(--muted);}
.badge.bad{border-color:rgba(255,112,112,.45);color:var(--red);}
.badge.warn{border-color:rgba(255,204,102,.45);color:var(--amber);}
.side-white{color:#ff8fd0;font-weight:700;}
.side-black{color:#8fd7ff;font-weight:700;}
.name{font-weight:700;margin:8px 0 2px;}
.mono{font-family:var(--mono);font-size:12.5px;color:var(--muted);}
details{margin-top:10px;border:1px solid var(--border);border-radius:10px;padding:8px 10px;}
summary{cursor:pointer;font-size:13.5px;}
.keep{color:var(--green);font-weight:700;}
.unresolved{color:var(--amber);font-weight:700;}
.err{color:var(--red);font-size:12.5px;margin-top:6px;}
table{width:100%;border-collapse:collapse;margin-top:8px;font-size:13px;}
th,td{text-align:left;padding:6px 8px;border-bottom:1px solid var(--border);}
th{color:var(--muted);font-size:12px;}
a{color:var(--accent);text-decoration:none;}
a:hover{text-decoration:underline;}
.hint{color:var(--muted);font-size:12.5px;margin-top:8px;}
</style>
</head>
<body>
<div class="wrap">
  <h1>Repertoire collisions report</h1>
  <p class="sub">Generated __GENERATED_AT__ · side=__SIDE__ · engine=__ENGINE__ · eval=__MOVE_EVAL__ · root=<span class="mono">__ROOT__</span></p>
  <p class="sub">Collisions are attributed to the deepest bucket that fully contains all involved lines, so each one appears exactly once.</p>
  <span class="pill">Unique collision buckets <b>__COUNT__</b></span>
  <div class="controls">
    <input id="q" placeholder="Search… (opening name, bucket key, move)"/>
    <select id="sideSel">
      <option value="all">All sides</option>
      <option value="white">White</option>
      <option value="black">Black</option>
    </select>
  </div>
  <main id="list"></main>
</div>
<script id="data" type="application/json">__DATA_JSON__</script>
<script>
const DATA = JSON.parse(document.getElementById('data').textContent);
const listEl = document.getElementById('list');
const qEl = document.getElementById('q');
const sideEl = document.getElementById('sideSel');

function esc(s){
  return String(s ?? '').replaceAll('&','&amp;').replaceAll('<','&lt;')
    .replaceAll('>','&gt;').replaceAll('"','&quot;');
}
function lichess(fen){
  return 'https://lichess.org/analysis/standard/' + encodeURIComponent(fen);
}
function optionRow(o){
  const ev = o.eval_move ? o.eval_move.pretty : '—';
  const keep = o.suggested ? ' <span class="keep">KEEP</span>' : '';
  const link = o.fen_after ? `<a href="${lichess(o.fen_after)}" target="_blank" rel="noopener">after-move</a>` : '—';
  const err = o.parse_error ? `<div class="err">${esc(o.parse_error)}</div>` : '';
  return `<tr><td class="mono"><b>${esc(o.move)}</b>${keep}${err}</td>
    <td>${o.count}</td><td><b>${esc(ev)}</b></td><td>${link}</td></tr>`;
}
function collisionBlock(c){
  const verdict = c.suggested_move
    ? `keep <span class="keep mono">${esc(c.suggested_move)}</span>, drop ${c.remove_lines.length} line(s)`
    : '<span class="unresolved">unresolved</span>';
  const posLink = c.pos ? ` · <a href="${lichess(c.pos.fen)}" target="_blank" rel="noopener">position</a>` : '';
  const err = c.parse_error ? `<div class="err">${esc(c.parse_error)}</div>` : '';
  return `<details>
    <summary>Move ${c.move_no} (ply ${c.ply}) — ${c.options.length} options — ${verdict}</summary>
    <div class="mono" style="margin-top:6px;">${esc(c.history_pgn)}${posLink}</div>
    ${err}
    <table><thead><tr><th>Next move</th><th>Lines</th><th>Eval</th><th>Link</th></tr></thead>
    <tbody>${c.options.map(optionRow).join('')}</tbody></table>
  </details>`;
}
function bucketCard(o){
  const sev = o.worst_options >= 5 ? 'bad' : (o.worst_options >= 4 ? 'warn' : '');
  return `<div class="card">
    <span class="badge"><span class="side-${o.side}">${o.side.toUpperCase()}</span></span>
    <span class="badge ${sev}">worst options ${o.worst_options}</span>
    <span class="badge">collisions ${o.collision_count}</span>
    <span class="badge">lines ${o.total_lines}</span>
    <span class="badge">earliest move ${o.earliest_move_no}</span>
    <div class="name">${esc(o.opening_primary)}</div>
    <div class="mono">bucket: ${esc(o.bucket_key)}</div>
    ${o.collisions.map(collisionBlock).join('')}
  </div>`;
}
function render(){
  const q = (qEl.value || '').trim().toLowerCase();
  const side = sideEl.value;
  let items = DATA.openings.slice();
  if (side !== 'all') items = items.filter(o => o.side === side);
  if (q){
    items = items.filter(o => {
      const hay = [o.side, o.opening_primary, (o.opening_names||[]).join(' '), o.bucket_key,
        (o.collisions||[]).map(c => c.history_pgn + ' ' + c.options.map(x => x.move).join(' ')).join(' ')
      ].join(' ').toLowerCase();
      return hay.includes(q);
    });
  }
  listEl.innerHTML = items.map(bucketCard).join('') ||
    '<p class="sub">Nothing matches — or the book is already unambiguous.</p>';
}
qEl.addEventListener('input', render);
sideEl.addEventListener('change', render);
render();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ReportMeta {
        ReportMeta {
            generated_at: "2024-01-01 00:00:00".to_string(),
            root: "/tmp/<book>".to_string(),
            side: "both".to_string(),
            engine: "stockfish".to_string(),
            move_eval: "time=0.08s".to_string(),
        }
    }

    #[test]
    fn renders_meta_and_count() {
        let html = render_html(&meta(), &[]).unwrap();
        assert!(html.contains("Unique collision buckets <b>0</b>"));
        assert!(html.contains("time=0.08s"));
        // Meta values are HTML-escaped.
        assert!(html.contains("/tmp/&lt;book&gt;"));
    }

    #[test]
    fn embedded_json_cannot_close_the_script_tag_early() {
        let html = render_html(&meta(), &[]).unwrap();
        let payload_start = html.find("<script id=\"data\"").unwrap();
        let payload = &html[payload_start..];
        let body = &payload[payload.find('>').unwrap() + 1..payload.find("</script>").unwrap()];
        assert!(serde_json::from_str::<serde_json::Value>(&body.replace("<\\/", "</")).is_ok());
    }
}

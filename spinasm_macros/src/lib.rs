use proc_macro::TokenStream;
use proc_macro2::{Delimiter, Spacing, Span, TokenStream as TokenStream2, TokenTree};
use quote::quote;
use syn::{parse::Parse, parse::ParseStream, Result as SynResult};

/// Inline spin program, expanding to `Vec<spinasm::Stmt>`.
///
/// ```ignore
/// let prog = spinasm! {
///     A 1;              // weight
///     A B -2.5;         // strength
///     A = C;            // chain
///     B := true;        // pin
///     assert A != B;    // assertion
/// };
/// ```
#[proc_macro]
pub fn spinasm(input: TokenStream) -> TokenStream {
    let top = syn::parse_macro_input!(input as Top);
    match build(top.tokens) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct Top {
    tokens: TokenStream2,
}
impl Parse for Top {
    fn parse(input: ParseStream) -> SynResult<Self> {
        Ok(Self {
            tokens: input.parse()?,
        })
    }
}

// -----------------------------
// Build
// -----------------------------

fn build(tokens: TokenStream2) -> SynResult<TokenStream2> {
    let toks: Vec<TokenTree> = tokens.into_iter().collect();
    let mut stmts = vec![];
    for item in split_statements(&toks)? {
        stmts.push(stmt_to_expr(parse_stmt(&item)?));
    }
    Ok(quote! {
        ::std::vec![ #(#stmts),* ]
    })
}

// -----------------------------
// AST
// -----------------------------

#[derive(Debug)]
enum StmtAst {
    Weight { var: String, value: f64 },
    Strength { a: String, b: String, value: f64 },
    Chain { a: String, b: String },
    Pin { var: String, value: bool },
    Assert(ExprAst),
}

#[derive(Debug)]
enum ExprAst {
    Num(i64),
    Var(String),
    Unary(UnOpAst, Box<ExprAst>),
    Binary(BinOpAst, Box<ExprAst>, Box<ExprAst>),
}

#[derive(Debug, Clone, Copy)]
enum UnOpAst {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy)]
enum BinOpAst {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

// -----------------------------
// AST -> Rust expressions
// -----------------------------

fn float_lit(v: f64) -> TokenStream2 {
    let mag = v.abs();
    if v.is_sign_negative() {
        quote! { -#mag }
    } else {
        quote! { #mag }
    }
}

fn stmt_to_expr(s: StmtAst) -> TokenStream2 {
    match s {
        StmtAst::Weight { var, value } => {
            let value = float_lit(value);
            quote! {
                spinasm::Stmt::Weight { var: ::std::string::String::from(#var), value: #value }
            }
        }
        StmtAst::Strength { a, b, value } => {
            let value = float_lit(value);
            quote! {
                spinasm::Stmt::Strength {
                    a: ::std::string::String::from(#a),
                    b: ::std::string::String::from(#b),
                    value: #value,
                }
            }
        }
        StmtAst::Chain { a, b } => quote! {
            spinasm::Stmt::Chain {
                a: ::std::string::String::from(#a),
                b: ::std::string::String::from(#b),
            }
        },
        StmtAst::Pin { var, value } => quote! {
            spinasm::Stmt::Pin { var: ::std::string::String::from(#var), value: #value }
        },
        StmtAst::Assert(e) => {
            let e = expr_to_expr(e);
            quote! { spinasm::Stmt::Assert(#e) }
        }
    }
}

fn unop_to_expr(op: UnOpAst) -> TokenStream2 {
    match op {
        UnOpAst::Not => quote! { spinasm::UnOp::Not },
        UnOpAst::Neg => quote! { spinasm::UnOp::Neg },
    }
}

fn binop_to_expr(op: BinOpAst) -> TokenStream2 {
    match op {
        BinOpAst::Mul => quote! { spinasm::BinOp::Mul },
        BinOpAst::Div => quote! { spinasm::BinOp::Div },
        BinOpAst::Rem => quote! { spinasm::BinOp::Rem },
        BinOpAst::Add => quote! { spinasm::BinOp::Add },
        BinOpAst::Sub => quote! { spinasm::BinOp::Sub },
        BinOpAst::Shl => quote! { spinasm::BinOp::Shl },
        BinOpAst::Shr => quote! { spinasm::BinOp::Shr },
        BinOpAst::Lt => quote! { spinasm::BinOp::Lt },
        BinOpAst::Le => quote! { spinasm::BinOp::Le },
        BinOpAst::Gt => quote! { spinasm::BinOp::Gt },
        BinOpAst::Ge => quote! { spinasm::BinOp::Ge },
        BinOpAst::Eq => quote! { spinasm::BinOp::Eq },
        BinOpAst::Ne => quote! { spinasm::BinOp::Ne },
        BinOpAst::BitAnd => quote! { spinasm::BinOp::BitAnd },
        BinOpAst::BitXor => quote! { spinasm::BinOp::BitXor },
        BinOpAst::BitOr => quote! { spinasm::BinOp::BitOr },
        BinOpAst::And => quote! { spinasm::BinOp::And },
        BinOpAst::Or => quote! { spinasm::BinOp::Or },
    }
}

fn expr_to_expr(e: ExprAst) -> TokenStream2 {
    match e {
        ExprAst::Num(n) => quote! { spinasm::Expr::Num(#n) },
        ExprAst::Var(name) => quote! { spinasm::Expr::var(#name) },
        ExprAst::Unary(op, x) => {
            let op = unop_to_expr(op);
            let x = expr_to_expr(*x);
            quote! { spinasm::Expr::unary(#op, #x) }
        }
        ExprAst::Binary(op, l, r) => {
            let op = binop_to_expr(op);
            let l = expr_to_expr(*l);
            let r = expr_to_expr(*r);
            quote! { spinasm::Expr::binary(#op, #l, #r) }
        }
    }
}

// -----------------------------
// Statements
// -----------------------------

fn split_statements(toks: &[TokenTree]) -> SynResult<Vec<Vec<TokenTree>>> {
    let mut out = vec![];
    let mut cur = vec![];
    for tt in toks {
        match tt {
            TokenTree::Punct(p) if p.as_char() == ';' => {
                if cur.is_empty() {
                    return Err(syn::Error::new(p.span(), "empty statement"));
                }
                out.push(std::mem::take(&mut cur));
            }
            _ => cur.push(tt.clone()),
        }
    }
    if let Some(first) = cur.first() {
        return Err(syn::Error::new(first.span(), "statement is missing a trailing `;`"));
    }
    Ok(out)
}

fn parse_stmt(toks: &[TokenTree]) -> SynResult<StmtAst> {
    let mut cur = Cursor::new(toks);
    if matches!(cur.peek(), Some(TokenTree::Ident(id)) if id == "assert") && toks.len() > 1 {
        cur.next();
        let e = parse_expr(&mut cur, 0)?;
        cur.expect_eof()?;
        return Ok(StmtAst::Assert(e));
    }

    let a = cur.expect_name()?;
    if cur.consume_pair(':', '=') {
        let value = cur.expect_bool()?;
        cur.expect_eof()?;
        return Ok(StmtAst::Pin { var: a, value });
    }
    if cur.consume_punct('=') {
        let b = cur.expect_name()?;
        cur.expect_eof()?;
        return Ok(StmtAst::Chain { a, b });
    }
    if matches!(cur.peek(), Some(TokenTree::Ident(_))) {
        let b = cur.expect_name()?;
        let value = cur.expect_number()?;
        cur.expect_eof()?;
        return Ok(StmtAst::Strength { a, b, value });
    }
    let value = cur.expect_number()?;
    cur.expect_eof()?;
    Ok(StmtAst::Weight { var: a, value })
}

// -----------------------------
// Expression parsing (Pratt)
// -----------------------------

const UNARY_PREC: u8 = 11;

fn infix_prec(op: BinOpAst) -> u8 {
    match op {
        BinOpAst::Or => 1,
        BinOpAst::And => 2,
        BinOpAst::BitOr => 3,
        BinOpAst::BitXor => 4,
        BinOpAst::BitAnd => 5,
        BinOpAst::Eq | BinOpAst::Ne => 6,
        BinOpAst::Lt | BinOpAst::Le | BinOpAst::Gt | BinOpAst::Ge => 7,
        BinOpAst::Shl | BinOpAst::Shr => 8,
        BinOpAst::Add | BinOpAst::Sub => 9,
        BinOpAst::Mul | BinOpAst::Div | BinOpAst::Rem => 10,
    }
}

fn parse_expr(cur: &mut Cursor, min_prec: u8) -> SynResult<ExprAst> {
    let mut lhs = parse_prefix(cur)?;

    loop {
        let Some((op, width)) = cur.peek_infix() else {
            break;
        };
        let prec = infix_prec(op);
        if prec < min_prec {
            break;
        }
        cur.pos += width;
        let rhs = parse_expr(cur, prec + 1)?;
        lhs = ExprAst::Binary(op, Box::new(lhs), Box::new(rhs));
    }

    Ok(lhs)
}

fn parse_prefix(cur: &mut Cursor) -> SynResult<ExprAst> {
    if cur.consume_punct('!') {
        let x = parse_expr(cur, UNARY_PREC)?;
        return Ok(ExprAst::Unary(UnOpAst::Not, Box::new(x)));
    }
    if cur.consume_punct('-') {
        let x = parse_expr(cur, UNARY_PREC)?;
        return Ok(ExprAst::Unary(UnOpAst::Neg, Box::new(x)));
    }
    parse_primary(cur)
}

fn parse_primary(cur: &mut Cursor) -> SynResult<ExprAst> {
    match cur.peek().cloned() {
        Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Parenthesis => {
            cur.next();
            let inner: Vec<TokenTree> = g.stream().into_iter().collect();
            let mut c2 = Cursor::new(&inner);
            let e = parse_expr(&mut c2, 0)?;
            c2.expect_eof()?;
            Ok(e)
        }
        Some(TokenTree::Ident(id)) if id == "true" || id == "false" => {
            cur.next();
            Ok(ExprAst::Num((id == "true") as i64))
        }
        Some(TokenTree::Ident(_)) => Ok(ExprAst::Var(cur.expect_name()?)),
        Some(TokenTree::Literal(l)) => {
            cur.next();
            let n: syn::LitInt = syn::parse2(TokenTree::Literal(l.clone()).into())
                .map_err(|_| syn::Error::new(l.span(), "expected an integer literal"))?;
            Ok(ExprAst::Num(n.base10_parse::<i64>()?))
        }
        Some(other) => Err(syn::Error::new(other.span(), "unexpected token in assertion")),
        None => Err(syn::Error::new(cur.span_here(), "unexpected end of assertion")),
    }
}

// -----------------------------
// Cursor utilities
// -----------------------------

struct Cursor<'a> {
    toks: &'a [TokenTree],
    pos: usize,
}
impl<'a> Cursor<'a> {
    fn new(toks: &'a [TokenTree]) -> Self {
        Self { toks, pos: 0 }
    }
    fn peek(&self) -> Option<&'a TokenTree> {
        self.toks.get(self.pos)
    }
    fn peek_punct(&self, offset: usize) -> Option<&'a proc_macro2::Punct> {
        match self.toks.get(self.pos + offset) {
            Some(TokenTree::Punct(p)) => Some(p),
            _ => None,
        }
    }
    fn next(&mut self) -> Option<&'a TokenTree> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }
    fn span_here(&self) -> Span {
        self.peek()
            .or_else(|| self.toks.last())
            .map(|t| t.span())
            .unwrap_or(Span::call_site())
    }
    fn expect_eof(&self) -> SynResult<()> {
        if self.pos < self.toks.len() {
            Err(syn::Error::new(self.span_here(), "unexpected trailing tokens"))
        } else {
            Ok(())
        }
    }
    fn consume_punct(&mut self, ch: char) -> bool {
        match self.peek_punct(0) {
            Some(p) if p.as_char() == ch => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }
    /// Two adjacent puncts such as `:=`.
    fn consume_pair(&mut self, a: char, b: char) -> bool {
        match (self.peek_punct(0), self.peek_punct(1)) {
            (Some(p), Some(q)) if p.as_char() == a && q.as_char() == b => {
                self.pos += 2;
                true
            }
            _ => false,
        }
    }
    /// Variable name: `ident` or `ident.ident...`.
    fn expect_name(&mut self) -> SynResult<String> {
        let mut name = match self.next() {
            Some(TokenTree::Ident(id)) => id.to_string(),
            Some(o) => return Err(syn::Error::new(o.span(), "expected a variable name")),
            None => return Err(syn::Error::new(self.span_here(), "expected a variable name")),
        };
        while matches!(self.peek_punct(0), Some(p) if p.as_char() == '.')
            && matches!(self.toks.get(self.pos + 1), Some(TokenTree::Ident(_)))
        {
            self.pos += 1;
            if let Some(TokenTree::Ident(id)) = self.next() {
                name.push('.');
                name.push_str(&id.to_string());
            }
        }
        Ok(name)
    }
    /// Optionally negated integer or float literal.
    fn expect_number(&mut self) -> SynResult<f64> {
        let neg = self.consume_punct('-');
        match self.next() {
            Some(TokenTree::Literal(l)) => {
                let lit: syn::Lit = syn::parse2(TokenTree::Literal(l.clone()).into())?;
                let v = match lit {
                    syn::Lit::Int(i) => i.base10_parse::<f64>()?,
                    syn::Lit::Float(f) => f.base10_parse::<f64>()?,
                    other => return Err(syn::Error::new(other.span(), "expected a number")),
                };
                Ok(if neg { -v } else { v })
            }
            Some(o) => Err(syn::Error::new(o.span(), "expected a number")),
            None => Err(syn::Error::new(self.span_here(), "expected a number")),
        }
    }
    /// `true`, `false`, `1` or `0`.
    fn expect_bool(&mut self) -> SynResult<bool> {
        match self.next() {
            Some(TokenTree::Ident(id)) if id == "true" => Ok(true),
            Some(TokenTree::Ident(id)) if id == "false" => Ok(false),
            Some(TokenTree::Literal(l)) if l.to_string() == "1" => Ok(true),
            Some(TokenTree::Literal(l)) if l.to_string() == "0" => Ok(false),
            Some(o) => Err(syn::Error::new(o.span(), "expected `true` or `false`")),
            None => Err(syn::Error::new(self.span_here(), "expected `true` or `false`")),
        }
    }

    /// Binary operator at the cursor and how many puncts it spans.
    fn peek_infix(&self) -> Option<(BinOpAst, usize)> {
        let p = self.peek_punct(0)?;
        let joint = p.spacing() == Spacing::Joint;
        let second = self.peek_punct(1).map(|q| q.as_char());
        let two = match (p.as_char(), second) {
            ('<', Some('<')) => Some(BinOpAst::Shl),
            ('>', Some('>')) => Some(BinOpAst::Shr),
            ('<', Some('=')) => Some(BinOpAst::Le),
            ('>', Some('=')) => Some(BinOpAst::Ge),
            ('=', Some('=')) => Some(BinOpAst::Eq),
            ('!', Some('=')) => Some(BinOpAst::Ne),
            ('&', Some('&')) => Some(BinOpAst::And),
            ('|', Some('|')) => Some(BinOpAst::Or),
            _ => None,
        };
        if let (true, Some(op)) = (joint, two) {
            return Some((op, 2));
        }
        let one = match p.as_char() {
            '*' => BinOpAst::Mul,
            '/' => BinOpAst::Div,
            '%' => BinOpAst::Rem,
            '+' => BinOpAst::Add,
            '-' => BinOpAst::Sub,
            '<' => BinOpAst::Lt,
            '>' => BinOpAst::Gt,
            '&' => BinOpAst::BitAnd,
            '^' => BinOpAst::BitXor,
            '|' => BinOpAst::BitOr,
            _ => return None,
        };
        Some((one, 1))
    }
}
